//! UI module for consistent CLI output
//!
//! Uses `cliclack` for styled status lines and spinners and `indicatif` for
//! the image save bar, with automatic fallback to plain output in
//! CI/non-interactive environments.

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{intro, remark, section, step_info, step_ok, step_ok_detail, step_warn_hint};
pub use progress::{SaveProgress, TaskSpinner};
pub use theme::{init_theme, LayerscopeTheme};

//! CLI command implementations

pub mod cat;
pub mod config;
pub mod ls;
pub mod tags;

pub use cat::execute as cat;
pub use config::execute as config;
pub use ls::execute as ls;
pub use tags::execute as tags;

use crate::config::Config;
use crate::error::LayerResult;
use crate::image::Image;
use crate::session::{AcquireOption, Session};
use crate::ui::{SaveProgress, TaskSpinner, UiContext};
use tracing::warn;

/// Acquire an image for a command, cleaning up the session's scratch space
/// whether or not `body` succeeds.
pub(crate) async fn with_image<T>(
    config: &Config,
    image: &str,
    option: AcquireOption,
    body: impl FnOnce(&Image) -> LayerResult<T>,
) -> LayerResult<T> {
    let ctx = UiContext::detect();
    let session = Session::new(config);

    let result = acquire(&ctx, &session, image, option)
        .await
        .and_then(|acquired| body(&acquired));

    if let Err(e) = session.cleanup() {
        warn!("{}", e);
        if result.is_ok() {
            return Err(e);
        }
    }
    result
}

async fn acquire(
    ctx: &UiContext,
    session: &Session,
    image: &str,
    option: AcquireOption,
) -> LayerResult<Image> {
    let progress = SaveProgress::spawn(ctx, session.bus());
    let provided = session.get_image(image, AcquireOption::Provide).await;
    progress.finish();
    let mut acquired = provided?;

    if option == AcquireOption::Read {
        let mut spinner = TaskSpinner::new(ctx);
        spinner.start(&format!("Indexing {} layers...", acquired.layers().len()));
        match acquired.read(session.registry()).await {
            Ok(()) => spinner.stop(&format!("Indexed {}", image)),
            Err(e) => {
                spinner.stop_error(&format!("Could not index {}", image));
                return Err(e);
            }
        }
    }
    Ok(acquired)
}

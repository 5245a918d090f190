//! Tags command - show the tags recorded in an image archive

use crate::cli::args::TagsArgs;
use crate::cli::commands::with_image;
use crate::config::Config;
use crate::error::LayerResult;
use crate::session::AcquireOption;
use crate::ui::{self, UiContext};

/// Execute the tags command
pub async fn execute(args: TagsArgs, config: &Config) -> LayerResult<()> {
    with_image(config, &args.image, AcquireOption::Provide, |image| {
        if image.tags().is_empty() {
            ui::step_info(&UiContext::detect(), "No tags recorded in this image");
        }
        for tag in image.tags() {
            println!("{}", tag);
        }
        Ok(())
    })
    .await
}

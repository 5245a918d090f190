//! Acquisition session
//!
//! A [`Session`] owns everything that must outlive a single acquisition:
//! the reference registry, the scratch directory tracker, the event bus and
//! the daemon client. Images obtained from a session stay valid until
//! [`Session::cleanup`] removes the scratch space behind them.

use crate::config::Config;
use crate::daemon::{CliDaemonClient, DaemonClient};
use crate::error::LayerResult;
use crate::event::EventBus;
use crate::file::ReferenceRegistry;
use crate::image::{
    parse_image_spec, DaemonProvider, Image, ImageProvider, ImageReference, SaveSettings, Source,
    TarballProvider,
};
use crate::tracker::ResourceTracker;
use std::sync::Arc;
use tracing::{debug, info};

/// How much work to do on an acquired image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquireOption {
    /// Decode the archive and attach its tags
    Provide,
    /// Decode, then scan every layer and record its files
    #[default]
    Read,
}

/// Caller-owned acquisition context
pub struct Session {
    registry: ReferenceRegistry,
    tracker: ResourceTracker,
    bus: EventBus,
    client: Arc<dyn DaemonClient>,
    settings: SaveSettings,
}

impl Session {
    /// Create a session talking to the daemon CLI named in the config
    pub fn new(config: &Config) -> Self {
        let client = Arc::new(CliDaemonClient::new(config.daemon.command.clone()));
        Self::with_client(config, client)
    }

    /// Create a session with a specific daemon client
    pub fn with_client(config: &Config, client: Arc<dyn DaemonClient>) -> Self {
        Self {
            registry: ReferenceRegistry::new(),
            tracker: ResourceTracker::new(
                config.scratch.prefix.clone(),
                config.scratch.root_or_temp(),
            ),
            bus: EventBus::default(),
            client,
            settings: config.daemon.save_settings(),
        }
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Pick the provider for a user supplied image string.
    ///
    /// Daemon sources get a fresh tracked scratch directory to save into.
    pub fn provider_for(&self, user_input: &str) -> LayerResult<ImageProvider> {
        let (source, location) = parse_image_spec(user_input)?;
        debug!(source = %source, location = %location, "resolved image source");

        match source {
            Source::DockerTarball => Ok(ImageProvider::Tarball(TarballProvider::new(location))),
            Source::DockerDaemon => {
                let image_ref = ImageReference::parse(&location)?;
                let cache_dir = self.tracker.new_scratch_dir()?;
                let provider =
                    DaemonProvider::new(image_ref, cache_dir, self.client.clone(), self.bus.clone())
                        .with_settings(self.settings);
                Ok(ImageProvider::Daemon(provider))
            }
        }
    }

    /// Acquire an image and optionally index its layers
    pub async fn get_image(&self, user_input: &str, option: AcquireOption) -> LayerResult<Image> {
        let provider = self.provider_for(user_input)?;
        let mut image = provider.provide().await?;

        if option == AcquireOption::Read {
            image.read(&self.registry).await?;
        }

        info!(image = %user_input, layers = image.layers().len(), "acquired image");
        Ok(image)
    }

    /// Remove every scratch directory created during this session
    pub fn cleanup(&self) -> LayerResult<()> {
        self.tracker.cleanup()
    }
}

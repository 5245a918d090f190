//! In-memory daemon for tests

use crate::daemon::{DaemonClient, ExportStream, ImageInspect};
use crate::error::{LayerError, LayerResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Serves one image from memory
#[derive(Debug, Default)]
pub(crate) struct FakeDaemon {
    pub virtual_size: u64,
    pub payload: Vec<u8>,
    pub fail_inspect: bool,
    pub fail_save: bool,
    pub fail_close: bool,
    /// Keep the export open after the payload instead of ending it
    pub stall: bool,
    pub saved: Mutex<Vec<String>>,
}

impl FakeDaemon {
    pub fn serving(payload: Vec<u8>) -> Self {
        Self {
            virtual_size: payload.len() as u64,
            payload,
            ..Self::default()
        }
    }
}

#[async_trait]
impl DaemonClient for FakeDaemon {
    async fn inspect(&self, image: &str) -> LayerResult<ImageInspect> {
        if self.fail_inspect {
            return Err(LayerError::upstream(
                format!("unable to inspect image {}", image),
                "No such image",
            ));
        }
        Ok(ImageInspect {
            id: "sha256:fake".to_string(),
            virtual_size: self.virtual_size,
            repo_tags: vec![image.to_string()],
        })
    }

    async fn save(&self, images: &[String]) -> LayerResult<Box<dyn ExportStream>> {
        if self.fail_save {
            return Err(LayerError::upstream("unable to save image tar", "daemon unavailable"));
        }
        self.saved.lock().extend(images.iter().cloned());
        Ok(Box::new(BufferedExport {
            data: Cursor::new(self.payload.clone()),
            fail_close: self.fail_close,
            stall: self.stall,
        }))
    }

    fn daemon_name(&self) -> &str {
        "fake"
    }
}

struct BufferedExport {
    data: Cursor<Vec<u8>>,
    fail_close: bool,
    stall: bool,
}

impl AsyncRead for BufferedExport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let drained = self.data.position() >= self.data.get_ref().len() as u64;
        if self.stall && drained {
            return Poll::Pending;
        }
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}

#[async_trait]
impl ExportStream for BufferedExport {
    async fn close(self: Box<Self>) -> LayerResult<()> {
        if self.fail_close {
            return Err(LayerError::upstream("unable to save image tar", "exit status 1"));
        }
        Ok(())
    }
}

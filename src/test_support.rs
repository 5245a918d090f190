//! Helpers for building tar archives in unit tests

use tar::{Builder, EntryType, Header};

/// Builds an in-memory tar archive entry by entry.
///
/// Entry names are written verbatim into the header, so names such as
/// `./b` or `c/../c` survive exactly as given.
pub(crate) struct TarFixture {
    builder: Builder<Vec<u8>>,
}

impl TarFixture {
    pub fn new() -> Self {
        Self {
            builder: Builder::new(Vec::new()),
        }
    }

    pub fn file(self, name: &str, content: &[u8]) -> Self {
        self.entry(name, EntryType::Regular, 0o644, content)
    }

    pub fn dir(self, name: &str) -> Self {
        self.entry(name, EntryType::Directory, 0o755, &[])
    }

    pub fn symlink(mut self, name: &str, target: &str) -> Self {
        let mut header = raw_header(name, EntryType::Symlink, 0o777, 0);
        header.set_link_name(target).unwrap();
        header.set_cksum();
        self.builder.append(&header, std::io::empty()).unwrap();
        self
    }

    pub fn global_header(self) -> Self {
        self.entry(
            "pax_global_header",
            EntryType::XGlobalHeader,
            0o644,
            b"22 comment=layerscope\n",
        )
    }

    pub fn entry(mut self, name: &str, entry_type: EntryType, mode: u32, content: &[u8]) -> Self {
        let mut header = raw_header(name, entry_type, mode, content.len() as u64);
        header.set_cksum();
        self.builder.append(&header, content).unwrap();
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.builder.into_inner().unwrap()
    }
}

fn raw_header(name: &str, entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    let slot = &mut header.as_old_mut().name;
    slot[..name.len()].copy_from_slice(name.as_bytes());
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_uid(1000);
    header.set_gid(1001);
    header.set_size(size);
    header
}

/// A two-layer `docker save` archive tagged with `tags`.
///
/// The base layer holds `/etc/hosts` and `/bin/sh`; the top layer replaces
/// `/etc/hosts` and adds `/app/run`.
pub(crate) fn docker_save_archive(tags: &[&str]) -> Vec<u8> {
    let base = TarFixture::new()
        .dir("etc/")
        .file("etc/hosts", b"127.0.0.1 localhost\n")
        .dir("bin/")
        .file("bin/sh", b"#!shell")
        .build();
    let top = TarFixture::new()
        .file("etc/hosts", b"10.0.0.1 app\n")
        .dir("app/")
        .file("app/run", b"run it")
        .build();

    let manifest = serde_json::json!([{
        "Config": "0123abcd.json",
        "RepoTags": tags,
        "Layers": ["base/layer.tar", "top/layer.tar"],
    }]);
    let config = serde_json::json!({
        "architecture": "amd64",
        "os": "linux",
        "created": "2024-01-01T00:00:00Z",
        "rootfs": {"type": "layers", "diff_ids": ["sha256:base", "sha256:top"]},
    });

    TarFixture::new()
        .file("0123abcd.json", config.to_string().as_bytes())
        .file("base/layer.tar", &base)
        .file("top/layer.tar", &top)
        .file("manifest.json", manifest.to_string().as_bytes())
        .build()
}

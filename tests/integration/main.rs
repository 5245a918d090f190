//! Integration tests for Layerscope

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn layerscope(home: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("layerscope");
        cmd.env("CI", "1")
            .env("LAYERSCOPE_CONFIG", home.path().join("config.toml"));
        cmd
    }

    fn append(builder: &mut tar::Builder<Vec<u8>>, name: &str, entry_type: tar::EntryType, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(entry_type);
        header.set_size(data.len() as u64);
        header.set_mode(if entry_type == tar::EntryType::Directory { 0o755 } else { 0o644 });
        builder.append_data(&mut header, name, data).unwrap();
    }

    fn layer_tar() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        append(&mut builder, "etc/", tar::EntryType::Directory, b"");
        append(&mut builder, "etc/motd", tar::EntryType::Regular, b"hello from the layer\n");
        builder.into_inner().unwrap()
    }

    /// Write a single-layer `docker save` archive and return its path
    fn image_tarball(dir: &Path) -> PathBuf {
        let config = br#"{"architecture":"amd64","os":"linux","rootfs":{"type":"layers","diff_ids":["sha256:aaaa"]}}"#;
        let manifest =
            br#"[{"Config":"cafe.json","RepoTags":["demo:1.0","demo:latest"],"Layers":["aaaa/layer.tar"]}]"#;

        let mut builder = tar::Builder::new(Vec::new());
        append(&mut builder, "cafe.json", tar::EntryType::Regular, config);
        append(&mut builder, "aaaa/layer.tar", tar::EntryType::Regular, &layer_tar());
        append(&mut builder, "manifest.json", tar::EntryType::Regular, manifest);

        let path = dir.join("demo.tar");
        std::fs::write(&path, builder.into_inner().unwrap()).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        layerscope(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("container images"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        layerscope(&home)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("layerscope"));
    }

    #[test]
    fn config_path() {
        let home = TempDir::new().unwrap();
        layerscope(&home)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let home = TempDir::new().unwrap();
        layerscope(&home)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[daemon]").and(predicate::str::contains("docker")));
    }

    #[test]
    fn config_init_then_set() {
        let home = TempDir::new().unwrap();
        layerscope(&home).args(["config", "init"]).assert().success();
        layerscope(&home)
            .args(["config", "set", "daemon.command", "podman"])
            .assert()
            .success();
        layerscope(&home)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("podman"));
    }

    #[test]
    fn config_set_unknown_key() {
        let home = TempDir::new().unwrap();
        layerscope(&home)
            .args(["config", "set", "daemon.colour", "red"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn tags_from_tarball() {
        let home = TempDir::new().unwrap();
        let image = image_tarball(home.path());
        layerscope(&home)
            .args(["tags", &format!("tarball:{}", image.display())])
            .assert()
            .success()
            .stdout("demo:1.0\ndemo:latest\n");
    }

    #[test]
    fn ls_plain_from_tarball() {
        let home = TempDir::new().unwrap();
        let image = image_tarball(home.path());
        layerscope(&home)
            .args(["ls", &format!("tarball:{}", image.display()), "--format", "plain"])
            .assert()
            .success()
            .stdout("0\t/etc\n0\t/etc/motd\n");
    }

    #[test]
    fn ls_json_from_tarball() {
        let home = TempDir::new().unwrap();
        let image = image_tarball(home.path());
        layerscope(&home)
            .args(["ls", &format!("tarball:{}", image.display()), "-f", "json"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("\"diff_id\": \"sha256:aaaa\"")
                    .and(predicate::str::contains("\"path\": \"/etc/motd\"")),
            );
    }

    #[test]
    fn cat_from_tarball() {
        let home = TempDir::new().unwrap();
        let image = image_tarball(home.path());
        layerscope(&home)
            .args(["cat", &format!("tarball:{}", image.display()), "0", "/etc/motd"])
            .assert()
            .success()
            .stdout("hello from the layer\n");
    }

    #[test]
    fn cat_missing_file() {
        let home = TempDir::new().unwrap();
        let image = image_tarball(home.path());
        layerscope(&home)
            .args(["cat", &format!("tarball:{}", image.display()), "0", "/etc/shadow"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("file /etc/shadow not found in tar"));
    }

    #[test]
    fn missing_tarball_fails() {
        let home = TempDir::new().unwrap();
        layerscope(&home)
            .args(["tags", "tarball:/nonexistent/image.tar"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn unknown_source_has_hint() {
        let home = TempDir::new().unwrap();
        layerscope(&home)
            .args(["tags", "oci://busybox"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn missing_daemon_cli_is_reported() {
        let home = TempDir::new().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[daemon]\ncommand = \"layerscope-no-such-daemon\"\n",
        )
        .unwrap();
        layerscope(&home)
            .args(["tags", "busybox:latest"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Container CLI not found"));
    }
}

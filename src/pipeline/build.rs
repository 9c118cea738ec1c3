//! ROM build through the containerised SGDK toolchain.
//!
//! The toolchain image compiles whatever project is mounted at `/src` and
//! leaves the cartridge image at `out/rom.bin`. The container runs as the
//! owner of the build tree so the files it writes stay removable by the
//! scratch cleanup.

use crate::error::Slide2RomError;
use crate::runner::{spawn_error, Invocation, ToolRunner};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Mount point of the build tree inside the toolchain container.
pub const CONTAINER_MOUNT: &str = "/src";
/// Artifact path, relative to the build tree.
pub const ROM_ARTIFACT: &str = "out/rom.bin";

/// Container runtime used to run the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    Docker,
    Podman,
}

impl ContainerRuntime {
    /// Probe PATH for `docker`, then `podman`.
    pub fn detect() -> Result<Self, Slide2RomError> {
        if which::which("docker").is_ok() {
            return Ok(Self::Docker);
        }
        if which::which("podman").is_ok() {
            return Ok(Self::Podman);
        }
        Err(Slide2RomError::ToolNotFound {
            tool: "docker".into(),
            hint: "Install Docker or Podman (Ubuntu: apt install docker.io).".into(),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }
}

impl fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A container runtime paired with the toolchain image it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    runtime: ContainerRuntime,
    image: String,
}

impl Toolchain {
    pub fn new(runtime: ContainerRuntime, image: impl Into<String>) -> Self {
        Self {
            runtime,
            image: image.into(),
        }
    }

    pub fn runtime(&self) -> ContainerRuntime {
        self.runtime
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn inspect_invocation(&self) -> Invocation {
        Invocation::new(self.runtime.as_str()).args(["image", "inspect", self.image.as_str()])
    }

    pub fn pull_invocation(&self) -> Invocation {
        Invocation::new(self.runtime.as_str()).args(["pull", self.image.as_str()])
    }

    /// `<runtime> run --rm -v <build_dir>:/src[:z] [--userns=keep-id] [-u uid:gid] <image>`
    pub fn run_invocation(&self, build_dir: &Path, owner: Option<(u32, u32)>) -> Invocation {
        let volume = match self.runtime {
            // SELinux relabel so the container may write the bind mount.
            ContainerRuntime::Podman => {
                format!("{}:{}:z", build_dir.display(), CONTAINER_MOUNT)
            }
            ContainerRuntime::Docker => format!("{}:{}", build_dir.display(), CONTAINER_MOUNT),
        };

        let mut invocation = Invocation::new(self.runtime.as_str())
            .args(["run", "--rm", "-v"])
            .arg(volume);
        if self.runtime == ContainerRuntime::Podman {
            invocation = invocation.arg("--userns=keep-id");
        }
        if let Some((uid, gid)) = owner {
            invocation = invocation.arg("-u").arg(format!("{uid}:{gid}"));
        }
        invocation.arg(&self.image)
    }

    /// Pull the image unless the runtime already has it.
    pub fn ensure_image(&self, runner: &dyn ToolRunner) -> Result<(), Slide2RomError> {
        let inspect = self.inspect_invocation();
        let output = runner
            .run(&inspect)
            .map_err(|e| spawn_error(&inspect, e))?;
        if output.success {
            debug!("Toolchain image {} is present", self.image);
            return Ok(());
        }

        info!("Pulling toolchain image {}", self.image);
        let pull = self.pull_invocation();
        let output = runner.run(&pull).map_err(|e| spawn_error(&pull, e))?;
        if !output.success {
            return Err(Slide2RomError::Build {
                detail: output.describe_failure(&pull),
            });
        }
        Ok(())
    }

    /// Compile `build_dir` and install the ROM at `rom_path`.
    ///
    /// Returns the ROM size in bytes. Nothing is written at `rom_path`
    /// unless the whole build succeeds.
    pub fn build(
        &self,
        runner: &dyn ToolRunner,
        build_dir: &Path,
        rom_path: &Path,
    ) -> Result<u64, Slide2RomError> {
        self.ensure_image(runner)?;

        let invocation = self.run_invocation(build_dir, tree_owner(build_dir));
        info!("Building ROM with {}", self.runtime);
        let output = runner
            .run(&invocation)
            .map_err(|e| spawn_error(&invocation, e))?;
        if !output.success {
            return Err(Slide2RomError::Build {
                detail: output.describe_failure(&invocation),
            });
        }

        let artifact = build_dir.join(ROM_ARTIFACT);
        if !artifact.is_file() {
            return Err(Slide2RomError::ArtifactMissing { path: artifact });
        }

        let bytes = install_rom(&artifact, rom_path)?;
        info!("ROM written: {} ({} bytes)", rom_path.display(), bytes);
        Ok(bytes)
    }
}

/// Host uid/gid owning `path`, passed to the container as `-u`.
#[cfg(unix)]
fn tree_owner(path: &Path) -> Option<(u32, u32)> {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata(path).ok().map(|m| (m.uid(), m.gid()))
}

#[cfg(not(unix))]
fn tree_owner(_path: &Path) -> Option<(u32, u32)> {
    None
}

/// Copy `artifact` to `dest` via a temporary sibling and an atomic rename,
/// with mode `0o644` on Unix. Returns the number of bytes copied.
pub fn install_rom(artifact: &Path, dest: &Path) -> Result<u64, Slide2RomError> {
    let write_err = |source: io::Error| Slide2RomError::OutputWriteFailed {
        path: dest.to_path_buf(),
        source,
    };

    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".slide2rom-")
        .suffix(".tmp")
        .tempfile_in(&parent)
        .map_err(write_err)?;

    let mut src = File::open(artifact).map_err(write_err)?;
    let bytes = io::copy(&mut src, tmp.as_file_mut()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(write_err)?;
    }

    tmp.persist(dest).map_err(|e| write_err(e.error))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ToolOutput;
    use std::collections::VecDeque;
    use std::fs;
    use std::sync::Mutex;

    /// Replays canned outputs and records every invocation. A `run` whose
    /// canned output succeeds may also drop a ROM into the build tree.
    struct Scripted {
        outputs: Mutex<VecDeque<ToolOutput>>,
        seen: Mutex<Vec<Invocation>>,
        rom: Option<(PathBuf, Vec<u8>)>,
    }

    impl Scripted {
        fn new(outputs: Vec<ToolOutput>) -> Self {
            Self {
                outputs: Mutex::new(outputs.into()),
                seen: Mutex::new(Vec::new()),
                rom: None,
            }
        }

        fn producing_rom(mut self, build_dir: &Path, bytes: &[u8]) -> Self {
            self.rom = Some((build_dir.join(ROM_ARTIFACT), bytes.to_vec()));
            self
        }

        fn subcommands(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|i| i.arg_strings()[0].clone())
                .collect()
        }
    }

    impl ToolRunner for Scripted {
        fn run(&self, inv: &Invocation) -> io::Result<ToolOutput> {
            self.seen.lock().unwrap().push(inv.clone());
            let out = self.outputs.lock().unwrap().pop_front().expect("unscripted call");
            if out.success && inv.arg_strings()[0] == "run" {
                if let Some((path, bytes)) = &self.rom {
                    fs::create_dir_all(path.parent().unwrap()).unwrap();
                    fs::write(path, bytes).unwrap();
                }
            }
            Ok(out)
        }
    }

    fn docker() -> Toolchain {
        Toolchain::new(ContainerRuntime::Docker, "ghcr.io/stephane-d/sgdk:latest")
    }

    #[test]
    fn docker_run_mounts_build_tree_as_owner() {
        let inv = docker().run_invocation(Path::new("/tmp/s/app"), Some((1000, 100)));
        assert_eq!(inv.program_name(), "docker");
        assert_eq!(
            inv.arg_strings(),
            vec![
                "run",
                "--rm",
                "-v",
                "/tmp/s/app:/src",
                "-u",
                "1000:100",
                "ghcr.io/stephane-d/sgdk:latest",
            ]
        );
    }

    #[test]
    fn podman_run_relabels_and_keeps_id() {
        let inv = Toolchain::new(ContainerRuntime::Podman, "sgdk")
            .run_invocation(Path::new("/tmp/s/app"), Some((1000, 1000)));
        let args = inv.arg_strings();
        assert_eq!(inv.program_name(), "podman");
        assert!(args.contains(&"/tmp/s/app:/src:z".to_string()));
        assert!(args.contains(&"--userns=keep-id".to_string()));
        assert_eq!(args.last().unwrap(), "sgdk");
    }

    #[test]
    fn run_without_owner_omits_user_flag() {
        let inv = docker().run_invocation(Path::new("/b"), None);
        assert!(!inv.arg_strings().contains(&"-u".to_string()));
    }

    #[test]
    fn cached_image_is_not_pulled() {
        let runner = Scripted::new(vec![ToolOutput::ok()]);
        docker().ensure_image(&runner).unwrap();
        assert_eq!(runner.subcommands(), vec!["image"]);
    }

    #[test]
    fn missing_image_is_pulled() {
        let runner = Scripted::new(vec![
            ToolOutput::failed(1, "Error: No such image"),
            ToolOutput::ok(),
        ]);
        docker().ensure_image(&runner).unwrap();
        assert_eq!(runner.subcommands(), vec!["image", "pull"]);
    }

    #[test]
    fn failed_pull_is_build_error() {
        let runner = Scripted::new(vec![
            ToolOutput::failed(1, "Error: No such image"),
            ToolOutput::failed(1, "denied: requested access to the resource is denied"),
        ]);
        let err = docker().ensure_image(&runner).unwrap_err();
        assert!(matches!(err, Slide2RomError::Build { .. }));
        assert!(err.to_string().contains("access"), "{err}");
    }

    #[test]
    fn successful_build_installs_rom() {
        let build = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let rom = out.path().join("deck.bin");
        let runner = Scripted::new(vec![ToolOutput::ok(), ToolOutput::ok()])
            .producing_rom(build.path(), &[0x4e; 4096]);

        let bytes = docker().build(&runner, build.path(), &rom).unwrap();
        assert_eq!(bytes, 4096);
        assert_eq!(fs::read(&rom).unwrap().len(), 4096);
        assert_eq!(runner.subcommands(), vec!["image", "run"]);
    }

    #[test]
    fn toolchain_failure_leaves_no_output() {
        let build = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let rom = out.path().join("deck.bin");
        let runner = Scripted::new(vec![
            ToolOutput::ok(),
            ToolOutput::failed(2, "make: *** [out/rom.out] Error 1"),
        ]);

        let err = docker().build(&runner, build.path(), &rom).unwrap_err();
        match err {
            Slide2RomError::Build { detail } => assert!(detail.contains("Error 1"), "{detail}"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!rom.exists());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn success_without_artifact_is_reported() {
        let build = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let rom = out.path().join("deck.bin");
        let runner = Scripted::new(vec![ToolOutput::ok(), ToolOutput::ok()]);

        let err = docker().build(&runner, build.path(), &rom).unwrap_err();
        assert!(matches!(err, Slide2RomError::ArtifactMissing { .. }));
        assert!(!rom.exists());
    }

    #[test]
    fn install_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("rom.bin");
        let dest = dir.path().join("deck.bin");
        fs::write(&artifact, b"new rom").unwrap();
        fs::write(&dest, b"old").unwrap();

        assert_eq!(install_rom(&artifact, &dest).unwrap(), 7);
        assert_eq!(fs::read(&dest).unwrap(), b"new rom");
    }

    #[cfg(unix)]
    #[test]
    fn installed_rom_is_not_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("rom.bin");
        fs::write(&artifact, b"rom").unwrap();
        fs::set_permissions(&artifact, fs::Permissions::from_mode(0o755)).unwrap();

        let dest = dir.path().join("deck.bin");
        install_rom(&artifact, &dest).unwrap();
        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn install_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("rom.bin");
        fs::write(&artifact, b"rom").unwrap();
        let err = install_rom(&artifact, &dir.path().join("nope/deck.bin")).unwrap_err();
        assert!(matches!(err, Slide2RomError::OutputWriteFailed { .. }));
    }
}

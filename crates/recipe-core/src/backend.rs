//! CMake as the external build system.
//!
//! Each step runs `cmake` as a child process. Output streams to the terminal
//! in verbose mode; otherwise every step appends to one log file and the
//! tail of that log is reported on failure.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{RecipeError, Result};
use crate::lifecycle::{BuildBackend, BuildObject};

const TAIL_LINES: usize = 20;

/// Drives `cmake` for configure, build and install.
#[derive(Debug, Clone)]
pub struct CMakeBackend {
    program: PathBuf,
    verbose: bool,
    log_path: PathBuf,
}

impl CMakeBackend {
    /// Locate `cmake` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::Build` if no `cmake` executable is found.
    pub fn locate(verbose: bool, log_path: PathBuf) -> Result<Self> {
        let program = which::which("cmake")
            .map_err(|e| RecipeError::build("configure", format!("cmake not found: {e}")))?;
        tracing::debug!("Using {}", program.display());
        Ok(Self::with_program(program, verbose, log_path))
    }

    /// Use an explicit executable.
    pub fn with_program(program: impl Into<PathBuf>, verbose: bool, log_path: PathBuf) -> Self {
        Self {
            program: program.into(),
            verbose,
            log_path,
        }
    }

    /// Log file written in non-verbose mode.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn run(&self, step: &'static str, args: Vec<OsString>) -> Result<()> {
        tracing::info!("Running cmake {step}");
        tracing::debug!("{} {:?}", self.program.display(), args);

        let mut cmd = Command::new(&self.program);
        cmd.args(&args);

        let status = if self.verbose {
            cmd.status()
                .map_err(|e| RecipeError::build(step, format!("failed to spawn cmake: {e}")))?
        } else {
            if let Some(parent) = self.log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)?;
            cmd.stdout(Stdio::from(log_file.try_clone()?))
                .stderr(Stdio::from(log_file))
                .status()
                .map_err(|e| RecipeError::build(step, format!("failed to spawn cmake: {e}")))?
        };

        if status.success() {
            return Ok(());
        }

        if !self.verbose {
            if let Ok(tail) = read_last_lines(&self.log_path, TAIL_LINES) {
                tracing::error!("cmake {step} failed. Last {TAIL_LINES} lines:\n{tail}");
            }
            return Err(RecipeError::build(
                step,
                format!(
                    "exit code {:?} (full log: {})",
                    status.code(),
                    self.log_path.display()
                ),
            ));
        }
        Err(RecipeError::build(
            step,
            format!("exit code {:?}", status.code()),
        ))
    }
}

impl BuildBackend for CMakeBackend {
    fn configure(&self, build: &BuildObject) -> Result<()> {
        self.run("configure", configure_args(build))
    }

    fn build(&self, build: &BuildObject) -> Result<()> {
        self.run("build", build_args(build, num_cpus::get()))
    }

    fn install(&self, build: &BuildObject) -> Result<()> {
        self.run("install", install_args(build))
    }
}

/// `-S <src> -B <build> [-G <gen>] -DCMAKE_BUILD_TYPE=<type> -D<K>=<V>...`
pub fn configure_args(build: &BuildObject) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-S".into(),
        build.source_dir.clone().into(),
        "-B".into(),
        build.build_dir.clone().into(),
    ];
    if let Some(generator) = &build.generator {
        args.push("-G".into());
        args.push(generator.into());
    }
    args.push(format!("-DCMAKE_BUILD_TYPE={}", build.build_type).into());
    for (key, value) in build.definitions() {
        args.push(format!("-D{key}={value}").into());
    }
    args
}

/// `--build <build> --config <type> --parallel <jobs>`
pub fn build_args(build: &BuildObject, jobs: usize) -> Vec<OsString> {
    vec![
        "--build".into(),
        build.build_dir.clone().into(),
        "--config".into(),
        build.build_type.clone().into(),
        "--parallel".into(),
        jobs.to_string().into(),
    ]
}

/// `--install <build> --config <type> --prefix <package>`
pub fn install_args(build: &BuildObject) -> Vec<OsString> {
    vec![
        "--install".into(),
        build.build_dir.clone().into(),
        "--config".into(),
        build.build_type.clone().into(),
        "--prefix".into(),
        build.package_dir.clone().into(),
    ]
}

/// Read the last `n` lines of `path` without loading the whole log.
fn read_last_lines(path: &Path, n: usize) -> std::io::Result<String> {
    use std::fs::File;
    use std::io::{Read, Seek, SeekFrom};

    const TAIL_SIZE: u64 = 16 * 1024;

    let mut file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let seek_pos = file_len.saturating_sub(TAIL_SIZE);
    file.seek(SeekFrom::Start(seek_pos))?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let buffer = String::from_utf8_lossy(&bytes);

    // Skip the partial first line after a mid-file seek
    let content = if seek_pos > 0 {
        buffer.find('\n').map_or(&buffer[..], |idx| &buffer[idx + 1..])
    } else {
        &buffer[..]
    };

    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{BuildConfig, BuildLifecycleController};
    use recipe_schema::{ToolchainValue, ToolchainVariables};
    use tempfile::tempdir;

    fn controller() -> BuildLifecycleController {
        BuildLifecycleController::new(BuildConfig {
            source_dir: PathBuf::from("/src/cppql"),
            build_dir: PathBuf::from("/tmp/build"),
            package_dir: PathBuf::from("/tmp/pkg"),
            generator: Some("Ninja".to_string()),
            build_type: "Debug".to_string(),
            definitions: ToolchainVariables::from([
                ("CPPQL_SHUTDOWN_DEFAULT_OFF".to_string(), ToolchainValue::Bool(true)),
                ("MANUAL_TAG".to_string(), ToolchainValue::from("1.0.0")),
            ]),
        })
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_configure_args() {
        let mut controller = controller();
        let args = strings(configure_args(controller.configure()));
        assert_eq!(
            args,
            vec![
                "-S",
                "/src/cppql",
                "-B",
                "/tmp/build",
                "-G",
                "Ninja",
                "-DCMAKE_BUILD_TYPE=Debug",
                "-DCPPQL_SHUTDOWN_DEFAULT_OFF=ON",
                "-DMANUAL_TAG=1.0.0",
            ]
        );
    }

    #[test]
    fn test_build_and_install_args() {
        let mut controller = controller();
        let object = controller.configure();
        assert_eq!(
            strings(build_args(object, 8)),
            vec!["--build", "/tmp/build", "--config", "Debug", "--parallel", "8"]
        );
        assert_eq!(
            strings(install_args(object)),
            vec!["--install", "/tmp/build", "--config", "Debug", "--prefix", "/tmp/pkg"]
        );
    }

    #[test]
    fn test_read_last_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build.log");
        let text: Vec<String> = (1..=30).map(|i| format!("line {i}")).collect();
        std::fs::write(&path, text.join("\n")).unwrap();

        let tail = read_last_lines(&path, 3).unwrap();
        assert_eq!(tail, "line 28\nline 29\nline 30");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_step_reports_log() {
        let Ok(program) = which::which("false") else {
            return;
        };
        let dir = tempdir().unwrap();
        let log = dir.path().join("logs").join("build.log");
        let backend = CMakeBackend::with_program(program, false, log.clone());

        let mut controller = controller();
        let err = backend.configure(controller.configure()).unwrap_err();
        assert!(matches!(err, RecipeError::Build { step: "configure", .. }));
        assert!(err.to_string().contains("build.log"));
        assert!(log.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_steps_share_log() {
        let Ok(program) = which::which("true") else {
            return;
        };
        let dir = tempdir().unwrap();
        let log = dir.path().join("build.log");
        let backend = CMakeBackend::with_program(program, false, log.clone());

        let mut controller = controller();
        controller.build(&backend).unwrap();
        controller.package(&backend).unwrap();
        assert_eq!(backend.log_path(), log.as_path());
        assert!(log.exists());
    }
}

//! @ai:module:intent Run user-configured analyzer, autofix and processor scripts
//! @ai:module:layer infrastructure
//! @ai:module:public_api run_script, run_processor
//! @ai:module:depends_on config, result, error

use crate::config::{ProcessorConfig, TestRunnerConfig};
use crate::error::{Error, Result};
use crate::result::AnalysisResult;
use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{debug, info};

/// @ai:intent Execute a checks/autofix script through its interpreter
/// @ai:pre root is the run directory, code_path is normalized
/// @ai:post the child sees CODE_PATH plus `env`; our own environment is untouched
/// @ai:effects fs:write (temp script), process:spawn
pub fn run_script(
    config: &TestRunnerConfig,
    root: &Path,
    code_path: &Path,
    env: &[(&str, &OsStr)],
) -> Result<()> {
    let mut script = tempfile::Builder::new().prefix("scatr-script").tempfile()?;
    script.write_all(config.script.as_bytes())?;
    script.flush()?;

    let mut command = Command::new(&config.interpreter);
    command
        .args(&config.args)
        .arg(script.path())
        .current_dir(root)
        .env("CODE_PATH", code_path)
        .envs(env.iter().copied());

    if config.interactive {
        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
    } else {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(io::stderr()))
            .stderr(Stdio::from(io::stderr()));
    }

    debug!(interpreter = %config.interpreter, args = ?config.args, "Spawning script");
    let start = Instant::now();
    let status = command.status()?;
    info!(elapsed = ?start.elapsed(), %status, "Script finished");

    if !status.success() {
        return Err(Error::Script {
            interpreter: config.interpreter.clone(),
            status,
        });
    }

    Ok(())
}

/// @ai:intent Turn the analyzer output file into a normalized analysis result
/// @ai:pre output_file is resolved against the run directory
/// @ai:post with skip_processing the file itself is read as the result JSON
/// @ai:effects fs:read, process:spawn
pub fn run_processor(
    config: &ProcessorConfig,
    root: &Path,
    output_file: &Path,
    code_path: &Path,
) -> Result<AnalysisResult> {
    if config.skip_processing {
        debug!(file = %output_file.display(), "Skipping result processing");
        let bytes = std::fs::read(output_file).map_err(|e| Error::FileRead {
            path: output_file.to_path_buf(),
            source: e,
        })?;
        return AnalysisResult::from_json(&bytes, code_path);
    }

    let mut child = Command::new(&config.interpreter)
        .current_dir(root)
        .env("INPUT_FILE", output_file)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;

    // stdin is written while stdout is drained.
    let writer = child.stdin.take().map(|mut stdin| {
        let script = config.script.clone();
        std::thread::spawn(move || stdin.write_all(script.as_bytes()))
    });

    let output = child.wait_with_output()?;

    if let Some(handle) = writer {
        if let Ok(written) = handle.join() {
            // A processor may legitimately exit before reading all of stdin.
            if let Err(e) = written {
                debug!(error = %e, "Processor closed stdin early");
            }
        }
    }

    if !output.status.success() {
        return Err(Error::Script {
            interpreter: config.interpreter.clone(),
            status: output.status,
        });
    }

    AnalysisResult::from_json(&output.stdout, code_path)
}

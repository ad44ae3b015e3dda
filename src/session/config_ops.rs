use super::*;

use super::client::DEVICE_ERROR;

/// Normalizes configuration text into comparable command lines.
///
/// Blank lines and `#` comments are dropped; surrounding whitespace is
/// trimmed so the same command from a file and from `show configuration`
/// compares equal.
fn config_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Candidate lines absent from the running configuration, `+`-prefixed.
fn merge_diff_lines(candidate: &[String], running: &[String]) -> Vec<String> {
    candidate
        .iter()
        .filter(|line| !running.contains(line))
        .map(|line| format!("+ {line}"))
        .collect()
}

/// Two-sided diff: running-only lines as `-`, candidate-only lines as `+`.
fn replace_diff_lines(candidate: &[String], running: &[String]) -> Vec<String> {
    let mut diff: Vec<String> = running
        .iter()
        .filter(|line| !candidate.contains(line))
        .map(|line| format!("- {line}"))
        .collect();
    diff.extend(
        candidate
            .iter()
            .filter(|line| !running.contains(line))
            .map(|line| format!("+ {line}")),
    );
    diff
}

/// Restore commands for a journal, in reverse execution order.
fn plan_unwind(journal: &[JournalEntry]) -> Vec<String> {
    journal
        .iter()
        .rev()
        .filter_map(|entry| entry.restore.clone())
        .collect()
}

impl ExosSession {
    async fn fetch_running_config(&mut self) -> Result<Vec<String>, DriverError> {
        let output = self.exec("show configuration").await?;
        Ok(config_lines(&output))
    }

    /// Runs one configuration command and journals it on success.
    async fn run_config_command(
        &mut self,
        command: &str,
        restore: Option<String>,
    ) -> Result<(), DriverError> {
        let output = self.exec(command).await?;
        if DEVICE_ERROR.is_match(&output) {
            return Err(DriverError::CommandFailed {
                command: command.to_string(),
                output: output.trim().to_string(),
            });
        }
        self.journal.push(JournalEntry {
            command: command.to_string(),
            restore,
        });
        Ok(())
    }

    pub(super) async fn stage_candidate(&mut self, source: ConfigSource) -> Result<(), DriverError> {
        let text = match source {
            ConfigSource::Text(text) => text,
            ConfigSource::Path(path) => tokio::fs::read_to_string(path).await?,
        };
        let lines = config_lines(&text);
        debug!(
            "staged candidate with {} lines for {}",
            lines.len(),
            self.params.hostname
        );
        self.candidate = Some(lines);
        Ok(())
    }

    pub(super) async fn merge_diff(&mut self) -> Result<String, DriverError> {
        let Some(candidate) = self.candidate.clone() else {
            return Ok(String::new());
        };
        let running = self.fetch_running_config().await?;
        Ok(merge_diff_lines(&candidate, &running).join("\n"))
    }

    pub(super) async fn replace_diff(&mut self) -> Result<String, DriverError> {
        let Some(candidate) = self.candidate.clone() else {
            return Ok(String::new());
        };
        let running = self.fetch_running_config().await?;
        Ok(replace_diff_lines(&candidate, &running).join("\n"))
    }

    /// Applies the candidate on top of the running configuration.
    ///
    /// Each applied line is journaled with its inferred inverse; a rejected
    /// line aborts immediately, leaving the journal for the caller's
    /// compensating rollback.
    pub(super) async fn apply_merge(&mut self) -> Result<(), DriverError> {
        let candidate = self.candidate.clone().ok_or(DriverError::NoCandidateLoaded)?;
        self.journal.clear();
        for line in &candidate {
            self.run_config_command(line, templates::infer_undo_command(line))
                .await?;
        }
        self.exec("save configuration").await?;
        self.candidate = None;
        Ok(())
    }

    /// Makes the candidate the entire configuration.
    ///
    /// Delete phase first: running-only lines are removed through their
    /// inferred inverse commands, journaled with the original line as the
    /// restore command. Then candidate-only lines are applied as in merge.
    pub(super) async fn apply_replace(&mut self) -> Result<(), DriverError> {
        let candidate = self.candidate.clone().ok_or(DriverError::NoCandidateLoaded)?;
        let running = self.fetch_running_config().await?;
        self.journal.clear();

        for line in running.iter().filter(|line| !candidate.contains(line)) {
            if let Some(undo) = templates::infer_undo_command(line) {
                self.run_config_command(&undo, Some(line.clone())).await?;
            }
        }
        for line in candidate.iter().filter(|line| !running.contains(line)) {
            self.run_config_command(line, templates::infer_undo_command(line))
                .await?;
        }

        self.exec("save configuration").await?;
        self.candidate = None;
        Ok(())
    }

    /// Replays journal restore commands in reverse execution order.
    ///
    /// The journal is cleared only after every restore command succeeded, so
    /// a failed rollback can be diagnosed from the remaining entries.
    pub(super) async fn unwind_journal(&mut self) -> Result<(), DriverError> {
        if self.journal.is_empty() {
            return Ok(());
        }
        let plan = plan_unwind(&self.journal);
        debug!(
            "rolling back {} of {} journaled commands on {}",
            plan.len(),
            self.journal.len(),
            self.params.hostname
        );
        for command in plan {
            let output = self.exec(&command).await?;
            if DEVICE_ERROR.is_match(&output) {
                return Err(DriverError::CommandFailed {
                    command,
                    output: output.trim().to_string(),
                });
            }
        }
        self.exec("save configuration").await?;
        self.journal.clear();
        Ok(())
    }
}

use super::*;

// EXOS prompts look like "X870-32c.1 # ", "* X870-32c.2 # " when there are
// unsaved changes, or "Slot-1 X465.3 # " on stacks. The counter after the
// dot increments with every command.
static PROMPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\* )?(! )?(Slot-\d+ )?[\w.-]+\.\d+ [#>] ?$").expect("prompt pattern")
});

// Interactive questions answered with "y" automatically, e.g.
// "Do you want to save configuration to primary.cfg and overwrite it? (y/N)".
static CONFIRM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((?:y/N|Y/N|yes/no)\)\s*$").expect("confirm pattern"));

// Pagination prompt; paging is disabled at open but can still appear if the
// device rejects `disable clipaging`.
static PAGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Press <SPACE> to continue or <Q> to quit").expect("pager pattern"));

/// Error markers EXOS prints for rejected configuration commands.
pub(super) static DEVICE_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(%% Invalid|Error:|Invalid input detected)").expect("error pattern")
});

impl ExosSession {
    /// Connects, requests a PTY shell, and waits for the initial prompt.
    async fn connect(&mut self) -> Result<(), DriverError> {
        let SessionParams {
            hostname,
            username,
            password,
            port,
            timeout,
            security,
        } = self.params.clone();
        let device_addr = format!("{username}@{hostname}:{port}");

        let config = Config {
            preferred: security.preferred(),
            inactivity_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let client = Client::connect_with_config(
            (hostname, port),
            &username,
            AuthMethod::with_password(&password),
            security.server_check.clone(),
            config,
        )
        .await?;
        debug!("{} TCP connection successful", device_addr);

        let mut channel = client.get_channel().await?;
        channel
            .request_pty(false, "xterm", 800, 600, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;
        debug!("{} shell request successful", device_addr);

        let (to_shell, mut from_user) = mpsc::channel::<String>(256);
        let (to_user, mut from_shell) = mpsc::channel::<String>(256);

        let io_addr = device_addr.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(data) = from_user.recv() => {
                        if let Err(e) = channel.data(data.as_bytes()).await {
                            debug!("{} failed to send data to shell: {:?}", io_addr, e);
                            break;
                        }
                    },
                    Some(msg) = channel.wait() => {
                        match msg {
                            ChannelMsg::Data { ref data } => {
                                if let Ok(s) = std::str::from_utf8(data)
                                    && to_user.send(s.to_string()).await.is_err() {
                                        debug!("{} shell output receiver dropped, closing task", io_addr);
                                        break;
                                    }
                            }
                            ChannelMsg::ExitStatus { exit_status } => {
                                debug!("{} shell exited with status code: {}", io_addr, exit_status);
                                let _ = channel.eof().await;
                                break;
                            }
                            ChannelMsg::Eof => {
                                debug!("{} shell sent EOF", io_addr);
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
            debug!("{} SSH I/O task ended", io_addr);
        });

        // Wait for the first prompt; banner questions are answered along the way.
        let mut buffer = String::new();
        let mut initial_output = String::new();
        let mut prompt = String::new();

        let init_result = tokio::time::timeout(timeout, async {
            loop {
                if let Some(data) = from_shell.recv().await {
                    trace!("{:?}", data);
                    buffer.push_str(&data);
                    initial_output.push_str(&data);

                    while let Some(newline_pos) = buffer.find('\n') {
                        buffer.drain(..=newline_pos);
                    }

                    if !buffer.is_empty() {
                        if PROMPT.is_match(buffer.trim_end()) {
                            prompt.push_str(&buffer);
                            return Ok(());
                        }
                        if CONFIRM.is_match(buffer.trim_end()) {
                            buffer.clear();
                            to_shell.send("y\n".to_string()).await?;
                        }
                    }
                } else {
                    return Err(DriverError::ChannelDisconnect);
                }
            }
        })
        .await;

        match init_result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(DriverError::InitTimeout(if initial_output.is_empty() {
                    "waiting for initial prompt".to_string()
                } else {
                    initial_output
                }));
            }
        }

        debug!("{} session established", device_addr);
        self.link = Some(ShellLink {
            client,
            to_shell,
            from_shell,
            prompt,
        });
        Ok(())
    }

    /// Last prompt presented by the device, if connected.
    pub fn prompt(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.prompt.as_str())
    }

    /// Executes one command and collects output until the next prompt.
    pub(super) async fn exec(&mut self, command: &str) -> Result<String, DriverError> {
        let timeout = self.params.timeout;
        let link = self.link.as_mut().ok_or(DriverError::SessionNotOpen)?;

        // Clear any residual data before sending.
        while link.from_shell.try_recv().is_ok() {}

        link.to_shell.send(format!("{command}\n")).await?;

        let mut clean_output = String::new();
        let mut line_buffer = String::new();

        let result = tokio::time::timeout(timeout, async {
            loop {
                if let Some(data) = link.from_shell.recv().await {
                    trace!("{:?}", data);
                    line_buffer.push_str(&data);

                    while let Some(newline_pos) = line_buffer.find('\n') {
                        let line = line_buffer.drain(..=newline_pos).collect::<String>();
                        clean_output.push_str(&line);
                    }

                    // The prompt arrives without a trailing newline, so the
                    // incomplete tail is where it shows up.
                    if !line_buffer.is_empty() {
                        let tail = line_buffer.trim_end().to_string();
                        if PROMPT.is_match(&tail) {
                            link.prompt = line_buffer.clone();
                            return Ok(());
                        }
                        if PAGER.is_match(&line_buffer) {
                            line_buffer.clear();
                            link.to_shell.send(" ".to_string()).await?;
                        } else if CONFIRM.is_match(&tail) {
                            clean_output.push_str(&line_buffer);
                            clean_output.push('\n');
                            line_buffer.clear();
                            link.to_shell.send("y\n".to_string()).await?;
                        }
                    }
                } else {
                    return Err(DriverError::ChannelDisconnect);
                }
            }
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(DriverError::ExecTimeout(clean_output)),
        }

        // Strip the echoed command from the beginning of the output.
        let mut content = clean_output.as_str();
        if !command.is_empty() && content.starts_with(command) {
            content = content
                .strip_prefix(command)
                .unwrap_or(content)
                .trim_start_matches(['\n', '\r']);
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl CliSession for ExosSession {
    async fn open(&mut self) -> Result<(), DriverError> {
        self.connect().await?;
        // Pager off so multi-page output arrives in one read.
        self.exec("disable clipaging").await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        debug!("closing session to {}", self.params.hostname);
        if let Some(link) = self.link.as_mut() {
            link.from_shell.close();
            if !link.client.is_closed() {
                if let Err(e) = link.to_shell.send("exit\n".to_string()).await {
                    debug!("failed to send exit command: {:?}", e);
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
        self.link = None;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.link
            .as_ref()
            .map(|link| !link.client.is_closed())
            .unwrap_or(false)
    }

    async fn send_command(&mut self, command: &str) -> Result<String, DriverError> {
        self.exec(command).await
    }

    async fn load_candidate(&mut self, source: ConfigSource) -> Result<(), DriverError> {
        self.stage_candidate(source).await
    }

    async fn compare_merge_config(&mut self) -> Result<String, DriverError> {
        self.merge_diff().await
    }

    async fn compare_replace_config(&mut self) -> Result<String, DriverError> {
        self.replace_diff().await
    }

    async fn commit_merge_config(&mut self) -> Result<(), DriverError> {
        self.apply_merge().await
    }

    async fn commit_replace_config(&mut self) -> Result<(), DriverError> {
        self.apply_replace().await
    }

    async fn discard_config(&mut self) -> Result<(), DriverError> {
        self.candidate = None;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        self.unwind_journal().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_pattern_matches_common_exos_prompts() {
        assert!(PROMPT.is_match("X870-32c.1 #"));
        assert!(PROMPT.is_match("* X870-32c.12 #"));
        assert!(PROMPT.is_match("Slot-1 edge-sw.3 #"));
        assert!(PROMPT.is_match("sw1.44 >"));
    }

    #[test]
    fn prompt_pattern_rejects_output_lines() {
        assert!(!PROMPT.is_match("SysName:          sw1"));
        assert!(!PROMPT.is_match("Port:   1"));
        assert!(!PROMPT.is_match("# comment line"));
    }

    #[test]
    fn confirm_pattern_matches_save_question() {
        assert!(CONFIRM.is_match(
            "Do you want to save configuration to primary.cfg and overwrite it? (y/N)"
        ));
        assert!(!CONFIRM.is_match("saving configuration..."));
    }

    #[test]
    fn device_error_pattern_matches_rejection_markers() {
        assert!(DEVICE_ERROR.is_match("Error: VLAN blue already exists"));
        assert!(DEVICE_ERROR.is_match("%% Invalid input detected at '^' marker."));
        assert!(!DEVICE_ERROR.is_match("SysName: sw1"));
    }
}

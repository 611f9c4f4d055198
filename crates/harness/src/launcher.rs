use std::path::{Path, PathBuf};

use tracing::{debug, error};

use tracebench_variants::{CommandRunner, Invocation, SystemRunner};

/// Controls the HTTP server under test. Every call reports success as a
/// bool; failures are logged with the control program's output.
pub trait ServerLauncher: Send + Sync {
    /// Syntax-check the server with extra `directives` applied.
    fn check_directives(&self, directives: &[String]) -> bool;
    fn check_config(&self, conf: &Path) -> bool;
    fn start(&self, conf: &Path) -> bool;
    fn stop(&self, conf: &Path) -> bool;
}

/// `apachectl`-style control program.
pub struct ApacheCtl {
    bin: PathBuf,
    runner: Box<dyn CommandRunner>,
}

impl ApacheCtl {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self::with_runner(bin, Box::new(SystemRunner))
    }

    pub fn with_runner(bin: impl Into<PathBuf>, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            bin: bin.into(),
            runner,
        }
    }

    fn run(&self, args: Vec<String>) -> bool {
        let invocation = Invocation::new(self.bin.display().to_string(), args);
        debug!(command = %invocation, "server control");
        match self.runner.run(&invocation) {
            Ok(output) if output.success() => true,
            Ok(output) => {
                error!(
                    command = %invocation,
                    exit_code = ?output.exit_code,
                    "server control failed"
                );
                error!("stdout: {}", output.stdout);
                error!("stderr: {}", output.stderr);
                false
            }
            Err(e) => {
                error!(command = %invocation, "cannot run server control: {e}");
                false
            }
        }
    }

    fn run_with_conf(&self, conf: &Path, extra: &[&str]) -> bool {
        if !conf.exists() {
            error!(conf = %conf.display(), "server configuration not found");
            return false;
        }
        let mut args = vec!["-f".to_string(), conf.display().to_string()];
        args.extend(extra.iter().map(|s| s.to_string()));
        self.run(args)
    }
}

impl ServerLauncher for ApacheCtl {
    fn check_directives(&self, directives: &[String]) -> bool {
        let mut args = Vec::with_capacity(directives.len() * 2 + 1);
        for directive in directives {
            args.push("-C".to_string());
            args.push(directive.clone());
        }
        args.push("-t".to_string());
        self.run(args)
    }

    fn check_config(&self, conf: &Path) -> bool {
        self.run_with_conf(conf, &["-t"])
    }

    fn start(&self, conf: &Path) -> bool {
        self.run_with_conf(conf, &["-k", "start"])
    }

    fn stop(&self, conf: &Path) -> bool {
        self.run_with_conf(conf, &["-k", "stop"])
    }
}

/// Where the server under test listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: Option<u16>,
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn make_url(&self, path: &str) -> String {
        match self.port {
            Some(port) => format!("http://{}:{port}{path}", self.host),
            None => format!("http://{}{path}", self.host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracebench_variants::BuildLayout;
    use tracebench_variants::testing::RecordingRunner;

    fn ctl(runner: &RecordingRunner) -> ApacheCtl {
        ApacheCtl::with_runner("/usr/sbin/apachectl", Box::new(runner.clone()))
    }

    #[test]
    fn directives_become_dash_c_pairs() {
        let runner = RecordingRunner::new(&BuildLayout::default());
        let ok = ctl(&runner).check_directives(&[
            "LoadModule datadog_module /tmp/mod_datadog.so".to_string(),
            "DatadogTracing On".to_string(),
        ]);
        assert!(ok);

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "/usr/sbin/apachectl");
        assert_eq!(
            calls[0].args,
            vec![
                "-C",
                "LoadModule datadog_module /tmp/mod_datadog.so",
                "-C",
                "DatadogTracing On",
                "-t"
            ]
        );
    }

    #[test]
    fn missing_conf_fails_without_running() {
        let runner = RecordingRunner::new(&BuildLayout::default());
        let ctl = ctl(&runner);
        let missing = Path::new("/definitely/not/here/httpd.conf");

        assert!(!ctl.check_config(missing));
        assert!(!ctl.start(missing));
        assert!(!ctl.stop(missing));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn start_and_stop_pass_the_conf() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conf = dir.path().join("httpd.conf");
        std::fs::write(&conf, "Listen 8080\n").expect("conf");
        let runner = RecordingRunner::new(&BuildLayout::default());
        let ctl = ctl(&runner);

        assert!(ctl.check_config(&conf));
        assert!(ctl.start(&conf));
        assert!(ctl.stop(&conf));

        let conf = conf.display().to_string();
        let calls = runner.calls();
        assert_eq!(calls[0].args, vec!["-f", conf.as_str(), "-t"]);
        assert_eq!(calls[1].args, vec!["-f", conf.as_str(), "-k", "start"]);
        assert_eq!(calls[2].args, vec!["-f", conf.as_str(), "-k", "stop"]);
    }

    #[test]
    fn non_zero_exit_is_reported_as_false() {
        let runner = RecordingRunner::new(&BuildLayout::default()).failing_when(|_| true);
        assert!(!ctl(&runner).check_directives(&["Bogus".to_string()]));
    }

    #[test]
    fn urls_include_port_when_set() {
        let endpoint = ServerEndpoint::new("127.0.0.1", Some(8080));
        assert_eq!(endpoint.make_url("/"), "http://127.0.0.1:8080/");
        assert_eq!(
            ServerEndpoint::new("localhost", None).make_url("/status"),
            "http://localhost/status"
        );
    }
}

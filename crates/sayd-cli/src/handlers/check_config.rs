//! `sayd check-config`

use std::fmt::Write as _;

use sayd_core::DaemonConfig;

/// Human-readable summary of a validated configuration.
pub fn render(config: &DaemonConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "socket:         {}", config.effective_socket_path().display());
    let _ = writeln!(
        out,
        "default module: {}",
        config.default_module.as_deref().unwrap_or("(first working)")
    );
    let _ = writeln!(out, "priority:       {}", config.default_priority);
    let _ = writeln!(out, "modules:        {}", config.modules.len());
    for module in &config.modules {
        let _ = write!(out, "  {:<12} {}", module.name, module.executable.display());
        if let Some(path) = &module.config_path {
            let _ = write!(out, " {}", path.display());
        }
        out.push('\n');
    }
    out
}

pub fn execute(config: &DaemonConfig) {
    print!("{}", render(config));
}

#[cfg(test)]
mod tests {
    use super::*;
    use sayd_core::ModuleConfig;

    #[test]
    fn lists_every_module() {
        let config = DaemonConfig {
            socket_path: Some("/tmp/sayd.sock".into()),
            modules: vec![
                ModuleConfig::new("espeak", "/usr/lib/sayd/sd_espeak")
                    .with_config_path("/etc/sayd/espeak.conf"),
                ModuleConfig::new("flite", "/usr/lib/sayd/sd_flite"),
            ],
            default_module: Some("flite".into()),
            ..DaemonConfig::default()
        };
        let text = render(&config);
        assert!(text.contains("socket:         /tmp/sayd.sock"));
        assert!(text.contains("default module: flite"));
        assert!(text.contains("espeak       /usr/lib/sayd/sd_espeak /etc/sayd/espeak.conf"));
        assert!(text.contains("modules:        2"));
        assert!(text.contains("priority:       text"));
    }
}

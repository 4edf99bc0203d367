//! Platform-equivalent detector.
//!
//! A rule that blocks `rm -rf` does nothing against `Remove-Item -Recurse`
//! or `rd /s /q`. This detector looks the rule's base command up in a static
//! table of per-platform equivalents and reports every non-POSIX platform
//! whose equivalents the regex never mentions.

use super::{Detector, DetectorKind, Gap, GapSeverity, GapType};
use crate::rules::{Pattern, RiskLevel};
use regex::Regex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::LazyLock;

/// Target platform for an equivalent command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Posix,
    PowerShell,
    Cmd,
}

impl Platform {
    pub const ALL: [Self; 3] = [Self::Posix, Self::PowerShell, Self::Cmd];

    /// Platforms a POSIX rule is checked against.
    pub const TARGETS: [Self; 2] = [Self::PowerShell, Self::Cmd];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Posix => "posix",
            Self::PowerShell => "powershell",
            Self::Cmd => "cmd",
        }
    }

    /// Capitalized label used in gap descriptions (`Powershell`).
    #[must_use]
    pub const fn heading(&self) -> &'static str {
        match self {
            Self::Posix => "Posix",
            Self::PowerShell => "Powershell",
            Self::Cmd => "Cmd",
        }
    }

    /// Rule-source shell name for a scoped replacement rule. POSIX is the
    /// source platform, so it has none.
    const fn shell_variant(self) -> Option<&'static str> {
        match self {
            Self::Posix => None,
            Self::PowerShell => Some("Shell::PowerShell"),
            Self::Cmd => Some("Shell::Cmd"),
        }
    }
}

/// Per-platform spellings of one command or flag.
#[derive(Debug, Clone, Copy)]
pub struct Equivalents {
    pub posix: &'static [&'static str],
    pub powershell: &'static [&'static str],
    pub cmd: &'static [&'static str],
}

impl Equivalents {
    #[must_use]
    pub const fn for_platform(&self, platform: Platform) -> &'static [&'static str] {
        match platform {
            Platform::Posix => self.posix,
            Platform::PowerShell => self.powershell,
            Platform::Cmd => self.cmd,
        }
    }
}

static COMMAND_EQUIVALENTS: LazyLock<HashMap<&'static str, Equivalents>> = LazyLock::new(|| {
    HashMap::from([
        (
            "rm",
            Equivalents {
                posix: &["rm", "unlink"],
                powershell: &["Remove-Item", "ri", "rm", "del", "erase", "rd"],
                cmd: &["del", "erase", "rd", "rmdir"],
            },
        ),
        (
            "dd",
            Equivalents {
                posix: &["dd"],
                powershell: &[],
                cmd: &[],
            },
        ),
        (
            "chmod",
            Equivalents {
                posix: &["chmod"],
                powershell: &["icacls", "Set-Acl"],
                cmd: &["icacls", "attrib", "cacls"],
            },
        ),
        (
            "chown",
            Equivalents {
                posix: &["chown"],
                powershell: &["Set-Acl", "takeown"],
                cmd: &["takeown", "icacls"],
            },
        ),
        (
            "find",
            Equivalents {
                posix: &["find"],
                powershell: &["Get-ChildItem", "gci", "dir", "ls"],
                cmd: &["dir", "where"],
            },
        ),
        (
            "grep",
            Equivalents {
                posix: &["grep", "egrep", "fgrep"],
                powershell: &["Select-String", "sls", "findstr"],
                cmd: &["findstr", "find"],
            },
        ),
        (
            "kill",
            Equivalents {
                posix: &["kill", "pkill", "killall"],
                powershell: &["Stop-Process", "spps", "kill"],
                cmd: &["taskkill"],
            },
        ),
        (
            "mv",
            Equivalents {
                posix: &["mv"],
                powershell: &["Move-Item", "mi", "mv", "move"],
                cmd: &["move", "ren", "rename"],
            },
        ),
        (
            "cp",
            Equivalents {
                posix: &["cp"],
                powershell: &["Copy-Item", "ci", "cp", "copy"],
                cmd: &["copy", "xcopy", "robocopy"],
            },
        ),
    ])
});

static FLAG_EQUIVALENTS: LazyLock<HashMap<(&'static str, &'static str), Equivalents>> =
    LazyLock::new(|| {
        HashMap::from([
            (
                ("rm", "-r"),
                Equivalents {
                    posix: &["-r", "-R", "--recursive"],
                    powershell: &["-Recurse", "-r"],
                    cmd: &["/s"],
                },
            ),
            (
                ("rm", "-f"),
                Equivalents {
                    posix: &["-f", "--force"],
                    powershell: &["-Force", "-f"],
                    cmd: &["/f", "/q"],
                },
            ),
            (
                ("find", "-name"),
                Equivalents {
                    posix: &["-name", "-iname"],
                    powershell: &["-Filter", "-Name"],
                    cmd: &[],
                },
            ),
        ])
    });

/// Boundary probes per lowercased equivalent name: `^cmd`, `cmd` followed by
/// whitespace or a `\s` escape, or `cmd` as a whole word.
static NAME_PROBES: LazyLock<HashMap<String, Regex>> = LazyLock::new(|| {
    let mut probes = HashMap::new();
    for equivalents in COMMAND_EQUIVALENTS.values() {
        for platform in Platform::ALL {
            for name in equivalents.for_platform(platform) {
                if let Entry::Vacant(slot) = probes.entry(name.to_lowercase()) {
                    let escaped = regex::escape(slot.key());
                    let probe = format!(r"^{escaped}|{escaped}\s|{escaped}\\s|\b{escaped}\b");
                    if let Ok(re) = Regex::new(&probe) {
                        slot.insert(re);
                    }
                }
            }
        }
    }
    probes
});

/// Lowercase, trimmed, last word of a base command (`sudo rm` -> `rm`).
#[must_use]
pub fn normalize_command(command_base: &str) -> String {
    command_base
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_lowercase()
}

/// Equivalents for a base command, if it is in the table.
#[must_use]
pub fn command_equivalents(command_base: &str) -> Option<&'static Equivalents> {
    COMMAND_EQUIVALENTS.get(normalize_command(command_base).as_str())
}

/// Cross-platform spellings of `flag` for `command`, if known.
#[must_use]
pub fn flag_equivalents(command: &str, flag: &str) -> Option<&'static Equivalents> {
    let command = normalize_command(command);
    FLAG_EQUIVALENTS
        .iter()
        .find(|((cmd, f), _)| *cmd == command && *f == flag)
        .map(|(_, equivalents)| equivalents)
}

/// True if any of `names` appears in `regex` at a command boundary.
#[must_use]
pub fn regex_mentions_any(regex: &str, names: &[&str]) -> bool {
    let lowered = regex.to_lowercase();
    names.iter().any(|name| {
        NAME_PROBES
            .get(&name.to_lowercase())
            .is_some_and(|probe| probe.is_match(&lowered))
    })
}

/// Detects rules that only block the POSIX spelling of a command.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformEquivalentDetector;

impl Detector for PlatformEquivalentDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Platform
    }

    fn detect(&self, pattern: &Pattern) -> Vec<Gap> {
        let Some(equivalents) = command_equivalents(pattern.command_base()) else {
            return Vec::new();
        };
        if equivalents.posix.is_empty() {
            return Vec::new();
        }

        let command = normalize_command(pattern.command_base());
        let mut gaps = Vec::new();

        for platform in Platform::TARGETS {
            let names = equivalents.for_platform(platform);
            let Some(primary) = names.first() else {
                continue;
            };
            if regex_mentions_any(pattern.regex(), names) {
                continue;
            }

            gaps.push(Gap::new(
                pattern,
                GapType::Platform,
                severity_for(platform, pattern.risk_level()),
                format!("{}: {primary}", platform.heading()),
                example_command(&command, platform, primary),
                recommendation(pattern, &command, platform, names),
            ));
        }

        gaps
    }
}

fn example_command(command: &str, platform: Platform, primary: &str) -> String {
    match (command, platform) {
        ("rm", Platform::PowerShell) => format!(r"{primary} -Recurse -Force C:\dangerous\path"),
        ("rm", Platform::Cmd) => format!(r"{primary} /s /q C:\dangerous\path"),
        ("chmod", Platform::PowerShell) => format!(r"{primary} C:\file.txt /grant Everyone:F"),
        ("find", Platform::PowerShell) => format!(r"{primary} -Path C:\ -Recurse -Filter *.txt"),
        _ => format!("{primary} <args>"),
    }
}

fn recommendation(pattern: &Pattern, command: &str, platform: Platform, names: &[&str]) -> String {
    let alternatives = names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");

    let mut text = match (pattern.shell_specific(), platform.shell_variant()) {
        (Some(_), Some(shell)) => format!(
            r"Create a separate pattern with shell_specific: {shell}, pattern: (?i)\b({alternatives})\b"
        ),
        _ => format!(
            r"Add alternation for {}: ({}|(?i)\b({alternatives})\b)",
            platform.label(),
            pattern.regex()
        ),
    };

    let flag_hints: Vec<String> = super::argument::extract_flags(pattern.regex())
        .iter()
        .filter_map(|flag| {
            let spellings = flag_equivalents(command, flag)?.for_platform(platform);
            (!spellings.is_empty()).then(|| format!("{flag} -> {}", spellings.join(" / ")))
        })
        .collect();
    if !flag_hints.is_empty() {
        text.push_str(&format!("; flags: {}", flag_hints.join(", ")));
    }

    text
}

/// PowerShell gaps sit one notch below the rule; cmd gaps two.
fn severity_for(platform: Platform, risk: RiskLevel) -> GapSeverity {
    match (platform, risk) {
        (Platform::PowerShell, RiskLevel::Critical) => GapSeverity::High,
        (Platform::PowerShell, RiskLevel::High) | (Platform::Cmd, RiskLevel::Critical) => {
            GapSeverity::Medium
        }
        _ => GapSeverity::Low,
    }
}

// Fixture rule source for the pga integration tests.
//
// Mirrors the layout of a real danger-pattern module: a static vector of
// `DangerPattern { ... }` literals. Only the blocks matter to the parser.

use once_cell::sync::Lazy;

pub static DANGEROUS_PATTERNS: Lazy<Vec<DangerPattern>> = Lazy::new(|| {
    vec![
        // Parent directory deletion
        DangerPattern {
            pattern: r"rm\s+-rf\s+\.\.".to_string(),
            risk_level: RiskLevel::Critical,
            description: "Recursive deletion of parent directory".to_string(),
            shell_specific: None,
        },
        DangerPattern {
            pattern: r"rm\s+-rf\s+/".to_string(),
            risk_level: RiskLevel::Critical,
            description: "Recursive deletion of root".to_string(),
            shell_specific: None,
        },
        DangerPattern {
            pattern: r"rm\s+\*".to_string(),
            risk_level: RiskLevel::High,
            description: "Delete everything in the current directory".to_string(),
            shell_specific: None,
        },
        DangerPattern {
            pattern: r"dd\s+if=/dev/zero\s+of=/dev/sd".to_string(),
            risk_level: RiskLevel::Critical,
            description: "Overwrite a disk with zeros".to_string(),
            shell_specific: None,
        },
        DangerPattern {
            pattern: r"chmod\s+-R\s+777\s+/".to_string(),
            risk_level: RiskLevel::High,
            description: "World-writable root".to_string(),
            shell_specific: Some(ShellType::Bash),
        },
        DangerPattern {
            pattern: r"Remove-Item\s+-Recurse\s+-Force\s+C:\\".to_string(),
            risk_level: RiskLevel::High,
            description: "Recursive deletion of the system drive".to_string(),
            shell_specific: Some(ShellType::PowerShell),
        },
        DangerPattern {
            pattern: r"git\s+reset\s+--hard".to_string(),
            risk_level: RiskLevel::Medium,
            description: "Discard uncommitted changes".to_string(),
            shell_specific: None,
        },
        // Missing description: dropped with a warning
        DangerPattern {
            pattern: r"shred\s+-u".to_string(),
            risk_level: RiskLevel::High,
            shell_specific: None,
        },
    ]
});

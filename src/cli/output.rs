//! Rendering of command results for people and for scripts.
//!
//! Every command returns a value implementing [`CommandOutput`]; the global
//! `--json` flag picks which rendering reaches stdout.

use serde::Serialize;

/// A command result that can be shown as text or as JSON.
pub trait CommandOutput: Serialize {
    /// Text for a terminal.
    fn to_human(&self) -> String;

    /// Machine-readable form; the serde representation unless overridden.
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Format `result` for the selected output mode.
pub fn render<T: CommandOutput>(result: &T, json_mode: bool) -> String {
    if json_mode {
        serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
    } else {
        result.to_human()
    }
}

/// Print `result` on stdout.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    println!("{}", render(result, json_mode));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Summary {
        turns: usize,
    }

    impl CommandOutput for Summary {
        fn to_human(&self) -> String {
            format!("Turns: {}", self.turns)
        }
    }

    #[test]
    fn test_human_mode_uses_text() {
        assert_eq!(render(&Summary { turns: 4 }, false), "Turns: 4");
    }

    #[test]
    fn test_json_mode_defaults_to_serde_form() {
        let rendered = render(&Summary { turns: 4 }, true);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value, serde_json::json!({"turns": 4}));
    }
}

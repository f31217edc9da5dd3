use anyhow::Result;
use serde::Serialize;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Single-line form for log pipelines and CI annotations.
pub fn render_json_line<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{CellConfig, Severity};

    #[test]
    fn enums_render_snake_case() {
        let rendered = render_json_line(&Severity::Critical).expect("render");
        assert_eq!(rendered, "\"critical\"");
    }

    #[test]
    fn pretty_output_spans_lines() {
        let rendered = render_json(&CellConfig::new(4, 32, 100, 10)).expect("render");
        assert!(rendered.contains("\n  \"memory_gb\": 32"));
    }
}

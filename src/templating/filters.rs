//! Custom Tera filters for dcgen templates.
//!
//! Every argument is a string, and list or map settings travel as JSON text
//! (`master_list = '["10.0.0.1"]'`). The `from_json` filter turns such a value back
//! into a structure templates can iterate:
//!
//! ```text
//! {% for ip in master_list | from_json %}
//!   - {{ ip }}
//! {% endfor %}
//! ```

use std::collections::HashMap;

/// Creates the `from_json` filter.
pub fn create_from_json_filter() -> impl tera::Filter + 'static {
    |value: &tera::Value, _args: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
        let text = value
            .as_str()
            .ok_or_else(|| tera::Error::msg("from_json filter requires a string value"))?;
        serde_json::from_str(text)
            .map_err(|e| tera::Error::msg(format!("from_json filter error: {}", e)))
    }
}

//! Documentation entries generated from schema declarations.

use serde::Serialize;

use crate::descriptor::Variable;
use crate::key::{join_prefix, normalize};
use crate::schema::{Member, Schema};

/// Documentation row for one declared variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelpEntry {
    /// Fully prefixed environment key, quoted in double backticks.
    pub key: String,
    /// Rendered type.
    pub type_name: String,
    /// Rendered default; empty when the variable has none.
    pub default: String,
    /// Help text, ending with a period when non-empty.
    pub help: String,
}

impl HelpEntry {
    /// Render the entry for `variable` under `prefix`.
    fn new(prefix: &str, variable: &Variable) -> Self {
        let mut help = variable.help().map(str::trim).unwrap_or_default().to_string();
        if !help.is_empty() && !help.ends_with('.') {
            help.push('.');
        }

        Self {
            key: format!("``{prefix}{}``", normalize(variable.name())),
            type_name: variable
                .help_type()
                .map_or_else(|| format!("``{}``", variable.tag()), str::to_string),
            default: match (variable.help_default(), variable.default_value()) {
                (Some(rendered), _) => rendered.to_string(),
                (None, Some(value)) => value.to_string(),
                (None, None) => String::new(),
            },
            help,
        }
    }
}

impl Schema {
    /// Documentation rows for the variables declared by this schema.
    ///
    /// Rows are sorted by declared variable name. With `recursive`, nested
    /// schemas follow depth-first, siblings ordered by their prefix, with keys
    /// prefixed exactly as they are looked up at construction time.
    ///
    /// Defaults are rendered with [`Value`](crate::types::Value)'s `Display`
    /// (`false`, `[a, b]`) unless the variable declares a `help_default`.
    #[must_use]
    pub fn help_info(&self, recursive: bool) -> Vec<HelpEntry> {
        let mut entries = Vec::new();
        self.collect_help("", recursive, &mut entries);
        entries
    }

    /// Append rows for this schema under `parent_prefix`.
    fn collect_help(&self, parent_prefix: &str, recursive: bool, entries: &mut Vec<HelpEntry>) {
        let prefix = join_prefix(parent_prefix, self.prefix());

        let mut variables: Vec<&Variable> = self
            .values()
            .filter_map(|member| match member {
                Member::Variable(variable) => Some(variable),
                _ => None,
            })
            .collect();
        variables.sort_by(|a, b| a.name().cmp(b.name()));
        entries.extend(variables.into_iter().map(|v| HelpEntry::new(&prefix, v)));

        if !recursive {
            return;
        }

        let mut nested: Vec<&Schema> = self
            .values()
            .filter_map(|member| match member {
                Member::Namespace(schema) => Some(schema.as_ref()),
                _ => None,
            })
            .collect();
        nested.sort_by(|a, b| a.prefix().cmp(b.prefix()));
        for schema in nested {
            schema.collect_help(&prefix, recursive, entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeTag;

    fn schema() -> Schema {
        let cache = Schema::builder()
            .prefix("cache")
            .var("ttl", Variable::builder(TypeTag::Int, "ttl").default(60).build().unwrap())
            .build()
            .unwrap();
        let db = Schema::builder()
            .prefix("db")
            .var("host", Variable::builder(TypeTag::Str, "host").help("Database host").build().unwrap())
            .build()
            .unwrap();

        Schema::builder()
            .prefix("app")
            .var(
                "workers",
                Variable::builder(TypeTag::Int, "workers")
                    .default(4)
                    .help("  Number of workers.  ")
                    .build()
                    .unwrap(),
            )
            .var(
                "debug",
                Variable::builder(TypeTag::Bool, "debug")
                    .help_type("boolean")
                    .help_default("off")
                    .default(false)
                    .build()
                    .unwrap(),
            )
            .var("name", Variable::builder(TypeTag::Str, "service.name").build().unwrap())
            .namespace("db", db)
            .namespace("cache", cache)
            .build()
            .unwrap()
    }

    #[test]
    fn test_help_info_top_level_sorted_by_name() {
        let entries = schema().help_info(false);
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["``APP_DEBUG``", "``APP_SERVICE_NAME``", "``APP_WORKERS``"]);
    }

    #[test]
    fn test_help_info_rendering() {
        let entries = schema().help_info(false);

        assert_eq!(
            entries[0],
            HelpEntry {
                key: "``APP_DEBUG``".to_string(),
                type_name: "boolean".to_string(),
                default: "off".to_string(),
                help: String::new(),
            }
        );
        assert_eq!(entries[1].type_name, "``str``");
        assert_eq!(entries[1].default, "");
        assert_eq!(entries[2].default, "4");
        assert_eq!(entries[2].help, "Number of workers.");
    }

    #[test]
    fn test_help_info_recursive_depth_first() {
        let entries = schema().help_info(true);
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "``APP_DEBUG``",
                "``APP_SERVICE_NAME``",
                "``APP_WORKERS``",
                "``APP_CACHE_TTL``",
                "``APP_DB_HOST``",
            ]
        );
        assert_eq!(entries[4].help, "Database host.");
    }

    #[test]
    fn test_help_default_uses_value_display() {
        let schema = Schema::builder()
            .var("hosts", Variable::builder(TypeTag::List, "hosts").default(vec!["a", "b"]).build().unwrap())
            .var("verbose", Variable::builder(TypeTag::Bool, "verbose").default(false).build().unwrap())
            .build()
            .unwrap();
        let entries = schema.help_info(false);
        assert_eq!(entries[0].default, "[a, b]");
        assert_eq!(entries[1].default, "false");
    }

    #[test]
    fn test_help_info_without_prefix() {
        let schema = Schema::builder()
            .var("port", Variable::builder(TypeTag::Int, "port").build().unwrap())
            .build()
            .unwrap();
        assert_eq!(schema.help_info(false)[0].key, "``PORT``");
    }

    #[test]
    fn test_help_entry_serializes() {
        let json = serde_json::to_value(&schema().help_info(false)[2]).unwrap();
        assert_eq!(json["key"], "``APP_WORKERS``");
        assert_eq!(json["default"], "4");
    }
}

//! MCP tool definitions derived from the registry

use serde_json::{json, Map, Value};

use super::protocol::ToolDefinition;
use crate::tools::{ComputationUnit, ToolRegistry};

/// One definition per registered tool, in name order
pub fn tool_definitions(registry: &ToolRegistry) -> Vec<ToolDefinition> {
    registry
        .units()
        .iter()
        .map(|unit| ToolDefinition {
            name: unit.name().to_string(),
            description: describe(unit.as_ref()),
            input_schema: input_schema(unit.as_ref()),
        })
        .collect()
}

fn describe(unit: &dyn ComputationUnit) -> String {
    format!(
        "{}. Returns {} ({} output).",
        unit.description(),
        unit.outputs().join(", "),
        unit.convention()
    )
}

/// JSON Schema for a unit's flat argument object
pub fn input_schema(unit: &dyn ComputationUnit) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for role in unit.inputs() {
        properties.insert(
            role.as_str().to_string(),
            json!({
                "type": "array",
                "items": {"type": "number"},
                "minItems": 1,
                "description": format!("{} price series", role)
            }),
        );
        required.push(Value::from(role.as_str()));
    }

    for spec in unit.params() {
        properties.insert(spec.name.to_string(), spec.json_schema());
        if spec.is_required() {
            required.push(Value::from(spec.name));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_follow_registry_order() {
        let registry = ToolRegistry::with_builtin_tools();
        let names: Vec<String> = tool_definitions(&registry)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, registry.list());
    }

    #[test]
    fn test_sma_schema() {
        let registry = ToolRegistry::with_builtin_tools();
        let sma = registry.get("sma").unwrap();
        let schema = input_schema(sma.as_ref());

        assert_eq!(schema["required"], json!(["close"]));
        assert_eq!(schema["properties"]["close"]["type"], "array");
        assert_eq!(schema["properties"]["timeperiod"]["type"], "integer");
        assert_eq!(schema["properties"]["timeperiod"]["default"], 20);
        assert_eq!(schema["properties"]["timeperiod"]["minimum"], 1.0);
    }

    #[test]
    fn test_required_param_and_nullable_param() {
        let registry = ToolRegistry::with_builtin_tools();

        let mavp = input_schema(registry.get("mavp").unwrap().as_ref());
        assert_eq!(mavp["required"], json!(["close", "periods"]));

        let sarext = input_schema(registry.get("sarext").unwrap().as_ref());
        assert_eq!(
            sarext["properties"]["startvalue"]["type"],
            json!(["number", "null"])
        );
        assert_eq!(sarext["required"], json!(["high", "low"]));
    }
}

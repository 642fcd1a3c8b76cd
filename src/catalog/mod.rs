/*
 * Action catalog: the closed set of supported actions, their argument schemas,
 * and the function-tool manifest handed to the language model
 */

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::models::{GridHookError, Result};
use crate::pool::validate_tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PlaceOrder,
    Swap,
    CheckPositions,
    GetHookPermissions,
    GetBalances,
}

/// Which pipeline serves an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Transaction,
    Query,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::PlaceOrder,
        ActionKind::Swap,
        ActionKind::CheckPositions,
        ActionKind::GetHookPermissions,
        ActionKind::GetBalances,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ActionKind::PlaceOrder => "place_order",
            ActionKind::Swap => "swap",
            ActionKind::CheckPositions => "check_positions",
            ActionKind::GetHookPermissions => "get_hook_permissions",
            ActionKind::GetBalances => "get_balances",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    #[must_use]
    pub fn route(self) -> Route {
        match self {
            ActionKind::PlaceOrder | ActionKind::Swap => Route::Transaction,
            ActionKind::CheckPositions | ActionKind::GetHookPermissions | ActionKind::GetBalances => {
                Route::Query
            }
        }
    }
}

/// A validated action with typed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    PlaceOrder {
        tick: i32,
        zero_for_one: bool,
        amount: String,
    },
    Swap {
        zero_for_one: bool,
        amount: String,
    },
    CheckPositions {
        tick: Option<i32>,
        include_empty: bool,
    },
    GetHookPermissions,
    GetBalances {
        address: Option<String>,
    },
}

impl Action {
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::PlaceOrder { .. } => ActionKind::PlaceOrder,
            Action::Swap { .. } => ActionKind::Swap,
            Action::CheckPositions { .. } => ActionKind::CheckPositions,
            Action::GetHookPermissions => ActionKind::GetHookPermissions,
            Action::GetBalances { .. } => ActionKind::GetBalances,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Boolean,
    /// Plain decimal text; JSON numbers are accepted and read as text.
    Decimal,
    Text,
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Decimal | ParamKind::Text => "string",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    /// Shown to the model only; plays no part in validation.
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

const PLACE_ORDER_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "tick",
        kind: ParamKind::Integer,
        required: true,
        description: "The tick price at which to place the order",
    },
    ParamSpec {
        name: "zero_for_one",
        kind: ParamKind::Boolean,
        required: true,
        description: "True if buying token1 (selling token0), False if buying token0 (selling token1)",
    },
    ParamSpec {
        name: "amount",
        kind: ParamKind::Decimal,
        required: true,
        description: "Amount of tokens to buy/sell",
    },
];

const SWAP_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "zero_for_one",
        kind: ParamKind::Boolean,
        required: true,
        description: "True if swapping token0 for token1, False if swapping token1 for token0",
    },
    ParamSpec {
        name: "amount",
        kind: ParamKind::Decimal,
        required: true,
        description: "Amount to swap (in human readable format, e.g. '1.5')",
    },
];

const CHECK_POSITIONS_PARAMS: &[ParamSpec] = &[
    ParamSpec {
        name: "tick",
        kind: ParamKind::Integer,
        required: false,
        description: "Specific tick to check. If not provided, checks multiple ticks around 0",
    },
    ParamSpec {
        name: "include_empty",
        kind: ParamKind::Boolean,
        required: false,
        description: "Also list tick/direction pairs with no pending or claimable amounts",
    },
];

const GET_BALANCES_PARAMS: &[ParamSpec] = &[ParamSpec {
    name: "address",
    kind: ParamKind::Text,
    required: false,
    description: "Address to check balances for. Can be 'user', 'gridhook', 'pool', or a specific Ethereum address",
}];

pub static ACTION_SPECS: [ActionSpec; 5] = [
    ActionSpec {
        kind: ActionKind::PlaceOrder,
        description: "Place a buy or sell order in the pool.\n\
            - To buy token1: set zero_for_one=true (selling token0 to buy token1)\n\
            - To buy token0: set zero_for_one=false (selling token1 to buy token0)\n\
            Examples:\n\
            - 'buy 100 token1 at tick 123' -> tick=123, zero_for_one=true, amount=100\n\
            - 'sell 50 token0 at tick -100' -> tick=-100, zero_for_one=true, amount=50",
        params: PLACE_ORDER_PARAMS,
    },
    ActionSpec {
        kind: ActionKind::Swap,
        description: "Perform a swap in the pool.\n\
            - To swap token0 for token1: set zero_for_one=true\n\
            - To swap token1 for token0: set zero_for_one=false\n\
            Examples:\n\
            - 'swap 1.5 token0 for token1' -> zero_for_one=true, amount=1.5\n\
            - 'swap 2 token1 for token0' -> zero_for_one=false, amount=2",
        params: SWAP_PARAMS,
    },
    ActionSpec {
        kind: ActionKind::CheckPositions,
        description: "Check pending orders and claimable tokens at specific ticks.\n\
            If no tick is provided, checks positions around current tick (-60, -1, 0, 1, 60).\n\
            Examples:\n\
            - 'show all positions'\n\
            - 'check position at tick 100'\n\
            - 'what orders are pending at tick 0'",
        params: CHECK_POSITIONS_PARAMS,
    },
    ActionSpec {
        kind: ActionKind::GetHookPermissions,
        description: "Get the permissions for the GridHook contract to understand which hooks are enabled",
        params: &[],
    },
    ActionSpec {
        kind: ActionKind::GetBalances,
        description: "Get token balances and names for an address. Shows balances of both tokens and ETH.\n\
            Examples:\n\
            - 'what is my balance'\n\
            - 'show gridhook balance'\n\
            - 'check pool balance'\n\
            - 'balance of 0x123...'",
        params: GET_BALANCES_PARAMS,
    },
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq)]
enum ArgValue {
    Int(i64),
    Bool(bool),
    Text(String),
}

struct Args<'a> {
    action: &'static str,
    values: HashMap<&'a str, ArgValue>,
}

impl Args<'_> {
    fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ArgValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    fn text(&self, name: &str) -> Option<String> {
        match self.values.get(name) {
            Some(ArgValue::Text(v)) => Some(v.clone()),
            _ => None,
        }
    }

    fn required<T>(&self, name: &str, value: Option<T>) -> Result<T> {
        value.ok_or_else(|| {
            GridHookError::ValidationError(format!("{}: missing required parameter '{name}'", self.action))
        })
    }

    fn tick(&self, name: &str) -> Result<Option<i32>> {
        self.int(name).map(validate_tick).transpose()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ActionCatalog {
    specs: &'static [ActionSpec],
}

impl ActionCatalog {
    /// The built-in catalog, checked against the set of handled actions.
    pub fn standard() -> Result<Self> {
        Self::with_specs(&ACTION_SPECS)
    }

    pub fn with_specs(specs: &'static [ActionSpec]) -> Result<Self> {
        let mut seen = HashSet::new();
        for spec in specs {
            if !seen.insert(spec.kind) {
                return Err(GridHookError::ConfigError(format!(
                    "action {} is declared twice",
                    spec.kind.name()
                )));
            }
        }
        if let Some(missing) = ActionKind::ALL.iter().find(|kind| !seen.contains(*kind)) {
            return Err(GridHookError::ConfigError(format!(
                "action {} has a handler but no catalog entry",
                missing.name()
            )));
        }
        Ok(Self { specs })
    }

    #[must_use]
    pub fn specs(&self) -> &'static [ActionSpec] {
        self.specs
    }

    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&'static ActionSpec> {
        self.specs.iter().find(|spec| spec.kind.name() == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.specs.iter().map(|spec| spec.kind.name()).collect()
    }

    /// Validates `arguments` against the action's schema and builds the typed action.
    pub fn parse(&self, name: &str, arguments: &Value) -> Result<Action> {
        let spec = self.spec(name).ok_or_else(|| {
            GridHookError::ValidationError(format!(
                "Unknown action '{name}'. Supported actions: {}",
                self.names().join(", ")
            ))
        })?;
        let action = spec.kind.name();

        let empty = Map::new();
        let object = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(GridHookError::ValidationError(format!(
                    "{action}: arguments must be a JSON object, got {other}"
                )))
            }
        };

        for key in object.keys() {
            if !spec.params.iter().any(|param| param.name == key) {
                warn!("Ignoring unknown argument '{}' for {}", key, action);
            }
        }

        let mut values = HashMap::new();
        for param in spec.params {
            let value = match object.get(param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(GridHookError::ValidationError(format!(
                        "{action}: missing required parameter '{}'",
                        param.name
                    )))
                }
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };
            values.insert(param.name, coerce(action, param, value)?);
        }

        let args = Args { action, values };
        let parsed = match spec.kind {
            ActionKind::PlaceOrder => Action::PlaceOrder {
                tick: args.required("tick", args.tick("tick")?)?,
                zero_for_one: args.required("zero_for_one", args.bool("zero_for_one"))?,
                amount: args.required("amount", args.text("amount"))?,
            },
            ActionKind::Swap => Action::Swap {
                zero_for_one: args.required("zero_for_one", args.bool("zero_for_one"))?,
                amount: args.required("amount", args.text("amount"))?,
            },
            ActionKind::CheckPositions => Action::CheckPositions {
                tick: args.tick("tick")?,
                include_empty: args.bool("include_empty").unwrap_or(false),
            },
            ActionKind::GetHookPermissions => Action::GetHookPermissions,
            ActionKind::GetBalances => Action::GetBalances {
                address: args.text("address"),
            },
        };
        Ok(parsed)
    }

    #[must_use]
    pub fn manifest(&self) -> Vec<ToolDefinition> {
        self.specs
            .iter()
            .map(|spec| {
                let properties: Map<String, Value> = spec
                    .params
                    .iter()
                    .map(|param| {
                        (
                            param.name.to_string(),
                            json!({
                                "type": param.kind.json_type(),
                                "description": param.description,
                            }),
                        )
                    })
                    .collect();
                let required: Vec<&str> = spec
                    .params
                    .iter()
                    .filter(|param| param.required)
                    .map(|param| param.name)
                    .collect();

                ToolDefinition {
                    tool_type: "function".to_string(),
                    function: FunctionDefinition {
                        name: spec.kind.name().to_string(),
                        description: spec.description.to_string(),
                        parameters: json!({
                            "type": "object",
                            "properties": properties,
                            "required": required,
                            "additionalProperties": false,
                        }),
                    },
                }
            })
            .collect()
    }
}

fn coerce(action: &str, param: &ParamSpec, value: &Value) -> Result<ArgValue> {
    let mismatch = || {
        GridHookError::ValidationError(format!(
            "{action}: parameter '{}' must be {}, got {value}",
            param.name,
            match param.kind {
                ParamKind::Integer => "an integer",
                ParamKind::Boolean => "a boolean",
                ParamKind::Decimal => "a decimal string",
                ParamKind::Text => "a string",
            }
        ))
    };

    match (param.kind, value) {
        (ParamKind::Integer, Value::Number(n)) => n.as_i64().map(ArgValue::Int).ok_or_else(mismatch),
        (ParamKind::Boolean, Value::Bool(b)) => Ok(ArgValue::Bool(*b)),
        (ParamKind::Decimal, Value::String(s)) | (ParamKind::Text, Value::String(s)) => {
            Ok(ArgValue::Text(s.clone()))
        }
        // only integers survive serde_json's f64 parsing exactly
        (ParamKind::Decimal, Value::Number(n)) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| n.as_i64().map(|v| v.to_string()))
            .map(ArgValue::Text)
            .ok_or_else(|| {
                GridHookError::ValidationError(format!(
                    "{action}: parameter '{}' must be sent as a decimal string, got {value}",
                    param.name
                ))
            }),
        _ => Err(mismatch()),
    }
}

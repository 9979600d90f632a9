use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::executor::helpers::Helpers;

/// One argument of an aggregate call, evaluated per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallArg {
    /// Top-level field of the row; missing fields are null.
    Column(String),
    /// Constant such as a percentile list or a top-n bound.
    Literal(Value),
}

impl CallArg {
    pub fn column(name: &str) -> Self { Self::Column(name.to_string()) }

    pub fn literal(v: impl Into<Value>) -> Self { Self::Literal(v.into()) }

    pub fn eval(&self, row: &Map<String, Value>) -> Value {
        match self {
            CallArg::Column(name) => Helpers::column(row, name),
            CallArg::Literal(v) => v.clone(),
        }
    }
}

/// A normalized aggregate call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCall {
    pub func: String,            // normalized lowercase
    pub args: Vec<CallArg>,
    #[serde(default)]
    pub alias: Option<String>,
}

impl AggregateCall {
    pub fn new(func: &str, args: Vec<CallArg>) -> Self {
        Self { func: func.to_ascii_lowercase(), args, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn eval_args(&self, row: &Map<String, Value>) -> Vec<Value> {
        self.args.iter().map(|a| a.eval(row)).collect()
    }

    /// Output column names for `calls`: the alias if given, otherwise the
    /// function name, suffixed `_1`, `_2`, ... to stay clear of `taken` and of
    /// each other.
    pub fn output_names(calls: &[AggregateCall], taken: &[String]) -> Vec<String> {
        let mut used: Vec<String> = taken.to_vec();
        let mut out = Vec::with_capacity(calls.len());
        for call in calls {
            let base = call.alias.clone().unwrap_or_else(|| call.func.clone());
            let mut name = base.clone();
            let mut k = 1usize;
            while used.contains(&name) {
                name = format!("{}_{}", base, k);
                k += 1;
            }
            used.push(name.clone());
            out.push(name);
        }
        out
    }
}

//! Programmable transaction staging
//!
//! The builder only records intent. Serialising to BCS and signing happen
//! behind [`crate::signing::TransactionSigner`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to a value inside a programmable transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "index")]
pub enum Argument {
    /// The coin paying for gas
    GasCoin,
    Input(u16),
    Result(u16),
    NestedResult(u16, u16),
}

/// Transaction input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum CallArg {
    #[serde(rename_all = "camelCase")]
    Object { object_id: String },
    Pure { value: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    MoveCall {
        package: String,
        module: String,
        function: String,
        type_arguments: Vec<String>,
        arguments: Vec<Argument>,
    },
    SplitCoins {
        coin: Argument,
        amounts: Vec<Argument>,
    },
    MergeCoins {
        destination: Argument,
        sources: Vec<Argument>,
    },
    TransferObjects {
        objects: Vec<Argument>,
        address: Argument,
    },
}

/// Immutable, fully staged transaction ready for signing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub sender: String,
    /// Gas budget in MIST
    pub gas_budget: u64,
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
}

impl TransactionRequest {
    /// Move entry points invoked, as `module::function`
    pub fn move_calls(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::MoveCall {
                    module, function, ..
                } => Some(format!("{}::{}", module, function)),
                _ => None,
            })
            .collect()
    }

    /// Short description for logs
    pub fn summary(&self) -> String {
        let calls = self.move_calls();
        if calls.is_empty() {
            format!("{} command(s)", self.commands.len())
        } else {
            calls.join(",")
        }
    }
}

/// Builder for [`TransactionRequest`]
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    inputs: Vec<CallArg>,
    commands: Vec<Command>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gas(&self) -> Argument {
        Argument::GasCoin
    }

    /// Reference an object input; the same id always maps to the same input.
    pub fn object(&mut self, object_id: &str) -> Argument {
        if let Some(pos) = self.inputs.iter().position(
            |input| matches!(input, CallArg::Object { object_id: id } if id == object_id),
        ) {
            return Argument::Input(pos as u16);
        }
        self.push_input(CallArg::Object {
            object_id: object_id.to_string(),
        })
    }

    pub fn pure(&mut self, value: impl Into<Value>) -> Argument {
        self.push_input(CallArg::Pure {
            value: value.into(),
        })
    }

    fn push_input(&mut self, arg: CallArg) -> Argument {
        self.inputs.push(arg);
        Argument::Input((self.inputs.len() - 1) as u16)
    }

    fn push_command(&mut self, command: Command) -> u16 {
        self.commands.push(command);
        (self.commands.len() - 1) as u16
    }

    /// Stage a Move call; `target` is `package::module::function`.
    pub fn move_call(&mut self, target: &str, arguments: Vec<Argument>) -> Argument {
        let mut parts = target.splitn(3, "::");
        let package = parts.next().unwrap_or_default().to_string();
        let module = parts.next().unwrap_or_default().to_string();
        let function = parts.next().unwrap_or_default().to_string();
        let idx = self.push_command(Command::MoveCall {
            package,
            module,
            function,
            type_arguments: Vec::new(),
            arguments,
        });
        Argument::Result(idx)
    }

    /// Split one coin of `amount` off `coin`, returning the new coin.
    pub fn split_coin(&mut self, coin: Argument, amount: u64) -> Argument {
        // u64 amounts travel as strings to survive JSON number limits
        let amount = self.pure(amount.to_string());
        let idx = self.push_command(Command::SplitCoins {
            coin,
            amounts: vec![amount],
        });
        Argument::NestedResult(idx, 0)
    }

    pub fn merge_coins(&mut self, destination: Argument, sources: Vec<Argument>) {
        self.push_command(Command::MergeCoins {
            destination,
            sources,
        });
    }

    pub fn transfer_objects(&mut self, objects: Vec<Argument>, recipient: &str) {
        let address = self.pure(recipient.to_string());
        self.push_command(Command::TransferObjects { objects, address });
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn build(self, sender: &str, gas_budget: u64) -> TransactionRequest {
        TransactionRequest {
            sender: sender.to_string(),
            gas_budget,
            inputs: self.inputs,
            commands: self.commands,
        }
    }
}

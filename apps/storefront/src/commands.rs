//! Parsing of the line-oriented storefront commands.

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Catalog,
    Add(String),
    Discount(String),
    Checkout,
    Destination(String),
    Ship { group: String, option: String },
    Pay(String),
    Next,
    Back,
    Shop,
    Cancel,
    Restart,
    Show,
    Profile,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  catalog                  list products
  add <product-id>         add a product to the cart
  discount <code>          apply a discount code
  checkout                 continue to shipping
  dest <destination-id>    choose where to ship
  ship <group-id> <option> choose a shipping option for a group
  next                     continue to the next step
  pay <instrument-id>      pay with a saved card
  back                     go back one step
  shop                     return to the catalog keeping the cart
  cancel                   cancel the checkout
  restart                  start over after an order
  show                     redraw the current step
  profile                  fetch the merchant profile
  help                     this text
  quit                     exit";

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let verb = verb.to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match (verb.as_str(), args.as_slice()) {
            ("catalog" | "ls", []) => Self::Catalog,
            ("add", [product]) => Self::Add(product.to_string()),
            ("discount", [code]) => Self::Discount(normalize_code(code)),
            ("checkout", []) => Self::Checkout,
            ("dest", [destination]) => Self::Destination(destination.to_string()),
            ("ship", [group, option]) => Self::Ship {
                group: group.to_string(),
                option: option.to_string(),
            },
            ("pay", [instrument]) => Self::Pay(instrument.to_string()),
            ("next", []) => Self::Next,
            ("back", []) => Self::Back,
            ("shop", []) => Self::Shop,
            ("cancel", []) => Self::Cancel,
            ("restart", []) => Self::Restart,
            ("show", []) => Self::Show,
            ("profile", []) => Self::Profile,
            ("help" | "?", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            ("add" | "discount" | "dest" | "ship" | "pay", _) => {
                bail!("usage: {}", usage(&verb))
            }
            (other, _) => bail!("unknown command '{other}', try 'help'"),
        };
        Ok(Some(command))
    }
}

/// Discount codes are matched case-insensitively by the merchant.
fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn usage(verb: &str) -> &'static str {
    match verb {
        "add" => "add <product-id>",
        "discount" => "discount <code>",
        "dest" => "dest <destination-id>",
        "ship" => "ship <group-id> <option-id>",
        _ => "pay <instrument-id>",
    }
}

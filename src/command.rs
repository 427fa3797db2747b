//! Instruction parsing: split, classify, extract.
//!
//! An instruction is a comma-separated list of clauses. Each clause is
//! classified once against a fixed keyword table into a closed [`Intent`];
//! downstream dispatch matches on the enum and never re-reads the text.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{AutomationError, Result};

const LOGIN_FORMAT: &str =
    "log into <site> with username <username> and password <password>";

/// Closed classification of one instruction clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Login {
        site: String,
        username: String,
        password: String,
    },
    Search {
        query: String,
    },
    AddToCart,
    Checkout,
    StarResult,
    /// Kept in the parsed sequence but never dispatched.
    Unrecognized,
}

#[derive(Debug, Clone)]
pub struct SubCommand {
    pub intent: Intent,
    /// Original clause text, used as the retry label and in logs.
    pub raw: String,
}

/// Split `instruction` on `", "` and classify every clause in order.
///
/// A clause that matches the login keyword but not the full login grammar
/// fails the whole instruction with a parse error; parse errors are never
/// retried.
pub fn interpret(instruction: &str) -> Result<Vec<SubCommand>> {
    instruction
        .split(", ")
        .map(|clause| {
            Ok(SubCommand {
                intent: classify(clause)?,
                raw: clause.to_string(),
            })
        })
        .collect()
}

fn classify(clause: &str) -> Result<Intent> {
    let lower = clause.to_lowercase();
    if lower.contains("log into") {
        extract_login(clause)
    } else if lower.contains("search for") {
        Ok(Intent::Search {
            query: extract_query(clause),
        })
    } else if lower.contains("add the first result to cart") {
        Ok(Intent::AddToCart)
    } else if lower.contains("go to cart and checkout") {
        Ok(Intent::Checkout)
    } else if lower.contains("star the first result") {
        Ok(Intent::StarResult)
    } else {
        Ok(Intent::Unrecognized)
    }
}

fn login_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Password tolerates embedded punctuation runs ("p@ss-word").
        Regex::new(r"(?i)log into (\w+) with username ([\w@.-]+) and password ([\w@]+(?:\W+\w+)*)")
            .expect("login pattern is valid")
    })
}

fn query_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)search for ").expect("query prefix is valid"))
}

fn extract_login(clause: &str) -> Result<Intent> {
    let caps = login_pattern().captures(clause).ok_or_else(|| {
        AutomationError::Parse(format!("expected \"{LOGIN_FORMAT}\""))
    })?;
    Ok(Intent::Login {
        site: caps[1].to_lowercase(),
        username: caps[2].to_string(),
        password: caps[3].to_string(),
    })
}

fn extract_query(clause: &str) -> String {
    query_prefix().replace(clause, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clauses_keep_source_order() {
        let commands = interpret(
            "log into saucedemo with username standard_user and password secret_sauce, \
             search for backpack, add the first result to cart, go to cart and checkout",
        )
        .unwrap();

        assert_eq!(commands.len(), 4);
        assert!(matches!(commands[0].intent, Intent::Login { .. }));
        assert!(matches!(commands[1].intent, Intent::Search { ref query } if query == "backpack"));
        assert!(matches!(commands[2].intent, Intent::AddToCart));
        assert!(matches!(commands[3].intent, Intent::Checkout));
    }

    #[test]
    fn login_extraction_tolerates_punctuated_credentials() {
        let commands =
            interpret("log into github with username a@b.com and password p@ss-word").unwrap();
        match &commands[0].intent {
            Intent::Login {
                site,
                username,
                password,
            } => {
                assert_eq!(site, "github");
                assert_eq!(username, "a@b.com");
                assert_eq!(password, "p@ss-word");
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }

    #[test]
    fn site_is_lowercased() {
        let commands = interpret(
            "Log into SauceDemo with username standard_user and password secret_sauce",
        )
        .unwrap();
        assert!(matches!(&commands[0].intent, Intent::Login { site, .. } if site == "saucedemo"));
    }

    #[test]
    fn malformed_login_clause_is_a_parse_error() {
        let err = interpret("log into badformat").unwrap_err();
        match err {
            AutomationError::Parse(msg) => assert!(msg.contains("log into <site>")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_clause_is_unrecognized_not_an_error() {
        let commands = interpret("dance a jig, search for backpack").unwrap();
        assert!(matches!(commands[0].intent, Intent::Unrecognized));
        assert!(matches!(commands[1].intent, Intent::Search { .. }));
    }

    #[test]
    fn empty_query_passes_through() {
        let commands = interpret("search for ").unwrap();
        assert!(matches!(&commands[0].intent, Intent::Search { query } if query.is_empty()));
    }

    #[test]
    fn keyword_matching_is_case_insensitive() {
        let commands = interpret("Star The First Result").unwrap();
        assert!(matches!(commands[0].intent, Intent::StarResult));
    }
}

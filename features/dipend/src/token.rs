use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use indexmap::IndexMap;

use crate::{errors::DependencyError, registry::DependencyId, types::TypeInfo};

/// Source of token and symbol ids, shared by every store in the process
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Identifies what is registered or requested
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// A Rust type, the usual way to name a dependency
    Type(TypeInfo),
    /// A string, equal to every other token with the same text
    Named(Arc<str>),
    /// A symbol, only equal to itself
    Unique { id: u64, description: &'static str },
}

impl Token {
    pub fn of<T: 'static + ?Sized>() -> Token {
        Token::Type(TypeInfo::of::<T>())
    }

    /// Accepts names only known at runtime, e.g. a qualifier read from a config file
    pub fn named(name: impl Into<Arc<str>>) -> Token {
        Token::Named(name.into())
    }

    /// Creates a new symbol token, distinct from every token created before
    pub fn unique(description: &'static str) -> Token {
        Token::Unique {
            id: next_id(),
            description,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Type(info) => f.write_str(&info.short_name()),
            Token::Named(name) => f.write_str(name),
            Token::Unique { description, .. } => write!(f, "Symbol({description})"),
        }
    }
}

/// The id assigned to a token on first sight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRegistryEntry {
    pub id: String,
    pub token: Token,
}

impl TokenRegistryEntry {
    fn new(token: Token) -> Self {
        // Hex digits only, so ids can never contain the dependency id separator
        TokenRegistryEntry {
            id: format!("{:x}", next_id()),
            token,
        }
    }
}

/// Maps tokens to stable ids and composes them into dependency ids
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: IndexMap<Token, TokenRegistryEntry>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up or creates an id for every present token and joins them into a dependency id
    ///
    /// Absent tokens are skipped, so `[Some(a), None]` and `[Some(a)]` name the same dependency.
    pub fn retrieve_or_create_dependency_id_by_tokens(
        &mut self,
        tokens: &[Option<Token>],
    ) -> DependencyId {
        let ids = tokens
            .iter()
            .flatten()
            .map(|token| {
                self.tokens
                    .entry(token.clone())
                    .or_insert_with(|| TokenRegistryEntry::new(token.clone()))
                    .id
                    .clone()
            })
            .collect::<Vec<_>>();

        DependencyId::compose(ids)
    }

    /// Shorthand for a primary token with an optional qualifier
    pub fn dependency_id(&mut self, token: Token, qualifier: Option<Token>) -> DependencyId {
        self.retrieve_or_create_dependency_id_by_tokens(&[Some(token), qualifier])
    }

    /// Reverse lookup of the tokens a dependency id was composed from
    ///
    /// Unknown fragments are skipped; fails only if no fragment is known.
    pub fn get_tokens(&self, dependency_id: &DependencyId) -> Result<Vec<Token>, DependencyError> {
        let tokens = dependency_id
            .token_ids()
            .filter_map(|token_id| {
                self.tokens
                    .values()
                    .find(|entry| entry.id == token_id)
                    .map(|entry| entry.token.clone())
            })
            .collect::<Vec<_>>();

        if tokens.is_empty() {
            return Err(DependencyError::MissingDependencyToken {
                dependency_ids: vec![dependency_id.clone()],
            });
        }

        Ok(tokens)
    }

    /// Human readable name of a dependency id, `Repo:primary` for a qualified registration
    ///
    /// Falls back to the raw id if none of its tokens are known.
    pub fn describe_dependency(&self, dependency_id: &DependencyId) -> String {
        match self.get_tokens(dependency_id) {
            Ok(tokens) => tokens
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(":"),
            Err(_) => dependency_id.to_string(),
        }
    }

    /// Forgets every token, all ids issued so far become invalid
    pub fn reset(&mut self) {
        self.tokens.clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

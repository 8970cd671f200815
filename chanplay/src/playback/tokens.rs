//! Caller-side callback token table
//!
//! The code that issues play requests owns the table: it allocates a token per
//! request, keeps whatever context it needs next to it, and frees the entry
//! when the sound subsystem hands the token back (`SoundFinished` or
//! `CallbackTokenReleasable`). Freeing an unknown token is logged, which is how
//! a double release would show up.

use chanplay_common::events::{CallbackToken, SoundEvent};
use std::collections::HashMap;
use tracing::warn;

/// Live callback tokens and their caller context
#[derive(Debug)]
pub struct TokenTable<T> {
    next_id: u64,
    live: HashMap<CallbackToken, T>,
}

impl<T> TokenTable<T> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            live: HashMap::new(),
        }
    }

    /// Allocate a token carrying `context`
    pub fn allocate(&mut self, context: T) -> CallbackToken {
        let token = CallbackToken(self.next_id);
        self.next_id += 1;
        self.live.insert(token, context);
        token
    }

    /// Free a token, returning its context
    pub fn free(&mut self, token: CallbackToken) -> Option<T> {
        let context = self.live.remove(&token);
        if context.is_none() {
            warn!("Callback token {} freed twice or never allocated", token);
        }
        context
    }

    /// Free whatever token `event` hands back
    pub fn apply(&mut self, event: &SoundEvent) -> Option<T> {
        event.returned_token().and_then(|token| self.free(token))
    }

    pub fn get(&self, token: CallbackToken) -> Option<&T> {
        self.live.get(&token)
    }

    pub fn contains(&self, token: CallbackToken) -> bool {
        self.live.contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl<T> Default for TokenTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

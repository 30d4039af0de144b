//! The game module holds the [Game] trait and the [ClaimTree], the local copy of an onchain
//! fault dispute game's claims.

use super::{Claim, ClaimData, FaultError, Position};
use anyhow::Result;
use std::collections::HashMap;

/// The [Game] trait defines the interface for a local copy of an onchain fault dispute game.
pub trait Game {
    /// Inserts a [Claim] into the game state.
    ///
    /// ### Takes
    /// - `claim`: The [Claim] to insert.
    ///
    /// ### Returns
    /// - `Ok(())`: The claim was stored.
    /// - `Err(anyhow::Error)`: The claim was rejected; the state is left untouched.
    fn put(&mut self, claim: Claim) -> Result<()>;

    /// Returns a snapshot of every stored [Claim], in insertion order.
    fn claims(&self) -> Vec<Claim>;

    /// Returns `true` if a claim already occupies the position of the given [ClaimData].
    fn is_duplicate(&self, claim: &ClaimData) -> bool;
}

/// The [ClaimTree] holds the claims of a single dispute game keyed by their [Position].
#[derive(Debug, Clone)]
pub struct ClaimTree {
    /// The claims in insertion order.
    claims: Vec<Claim>,
    /// Maps each occupied [Position] to its index in `claims`.
    positions: HashMap<Position, usize>,
    /// The maximum depth of the game tree.
    max_depth: u8,
}

impl ClaimTree {
    /// Creates an empty [ClaimTree] for a game of the given maximum depth.
    /// Creates an empty [ClaimTree] that accepts positions up to `max_depth`.
    pub fn new(max_depth: u8) -> Self {
        Self {
            claims: Vec::new(),
            positions: HashMap::new(),
            max_depth,
        }
    }

    /// Returns the maximum depth of the tree.
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Returns the number of stored claims.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Returns `true` if no claim is stored.
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Returns the [Claim] at the given [Position], if any.
    pub fn get(&self, position: Position) -> Option<&Claim> {
        self.positions.get(&position).map(|&i| &self.claims[i])
    }

    /// Returns `true` if a claim is stored at the given [Position].
    pub fn contains(&self, position: Position) -> bool {
        self.positions.contains_key(&position)
    }
}

impl Game for ClaimTree {
    fn put(&mut self, claim: Claim) -> Result<()> {
        let position = claim.data.position;
        if self.contains(position) {
            return Err(FaultError::DuplicateClaim(position).into());
        }
        if position.depth() > self.max_depth {
            return Err(FaultError::MaxDepthExceeded {
                position,
                max_depth: self.max_depth,
            }
            .into());
        }

        self.positions.insert(position, self.claims.len());
        self.claims.push(claim);
        Ok(())
    }

    fn claims(&self) -> Vec<Claim> {
        self.claims.clone()
    }

    fn is_duplicate(&self, claim: &ClaimData) -> bool {
        self.contains(claim.position)
    }
}

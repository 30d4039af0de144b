//! The types module contains all of the types relevant to the fault dispute game.

use super::Position;
use ethers::types::H256;

/// The [Clock] struct represents a clock that is used to track the duration and timestamp of a
/// given claim within the game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clock {
    /// The duration elapsed on the chess clock when it was last stopped.
    pub duration: u64,
    /// The timestamp at which the clock was last updated.
    pub timestamp: u64,
}

/// Unpacks the onchain clock: the upper 64 bits hold the duration, the lower 64 bits the
/// timestamp.
impl From<u128> for Clock {
    fn from(packed: u128) -> Self {
        Self {
            duration: (packed >> 64) as u64,
            timestamp: (packed & u64::MAX as u128) as u64,
        }
    }
}

/// The [ClaimData] struct holds a claimed trace commitment and the [Position] it is made at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimData {
    /// The claimed commitment at the position.
    pub value: H256,
    /// The position of the claim within the game tree.
    pub position: Position,
}

/// The [Claim] struct represents a claim in the game DAG along with the data of its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// The value and position of the claim.
    pub data: ClaimData,
    /// The hydrated parent data. Always [None] for the root claim.
    pub parent: Option<ClaimData>,
    /// The index of the claim in the onchain claim data array.
    pub contract_index: usize,
    /// The index of the parent claim in the onchain claim data array.
    pub parent_contract_index: usize,
    /// Whether or not the claim had been countered when it was fetched.
    pub countered: bool,
    /// The chess clock of the claim.
    pub clock: Clock,
}

impl Claim {
    /// Returns `true` if the claim is at the root position.
    pub fn is_root_position(&self) -> bool {
        self.data.position.is_root()
    }

    /// Returns `true` if the claim sits at the right child of its parent's position.
    pub fn defends_parent(&self) -> bool {
        self.parent
            .map_or(false, |parent| self.data.position == parent.position.right_child())
    }

    /// Returns the claimed value as raw bytes.
    pub fn value_bytes(&self) -> [u8; 32] {
        self.data.value.0
    }

    /// Returns the depth of the claim's position.
    pub fn depth(&self) -> u8 {
        self.data.position.depth()
    }
}

/// A [Response] is a counter claim computed by a solver that has not been submitted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// The index of the countered claim in the onchain claim data array.
    pub parent_contract_index: usize,
    /// The countered claim.
    pub parent: ClaimData,
    /// The claim to submit: the target position and our value for it.
    pub data: ClaimData,
}

impl Response {
    /// Returns `true` if the response is a defense of its parent, `false` if it is an attack.
    pub fn defends_parent(&self) -> bool {
        self.data.position == self.parent.position.right_child()
    }

    /// Returns the value to submit as raw bytes.
    pub fn value_bytes(&self) -> [u8; 32] {
        self.data.value.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn claim_data(gindex: u128) -> ClaimData {
        ClaimData {
            value: H256::repeat_byte(gindex as u8),
            position: Position::from_gindex(gindex).unwrap(),
        }
    }

    #[test]
    fn clock_unpacking() {
        let clock = Clock::from(0xa0000000000000001u128);
        assert_eq!(clock.duration, 10);
        assert_eq!(clock.timestamp, 1);
    }

    #[test]
    fn claim_defends_parent() {
        let mut claim = Claim {
            data: claim_data(5),
            parent: Some(claim_data(2)),
            contract_index: 2,
            parent_contract_index: 1,
            countered: false,
            clock: Clock::default(),
        };
        assert!(claim.defends_parent());
        assert!(!claim.is_root_position());

        claim.data = claim_data(4);
        assert!(!claim.defends_parent());
    }

    #[test]
    fn root_claim_never_defends() {
        let root = Claim {
            data: claim_data(1),
            parent: None,
            contract_index: 0,
            parent_contract_index: u32::MAX as usize,
            countered: false,
            clock: Clock::default(),
        };
        assert!(root.is_root_position());
        assert!(!root.defends_parent());
        assert_eq!(root.value_bytes(), [1u8; 32]);
    }

    #[test]
    fn response_direction() {
        let parent = claim_data(3);
        let attack = Response {
            parent_contract_index: 4,
            parent,
            data: claim_data(6),
        };
        let defend = Response {
            data: claim_data(7),
            ..attack
        };
        assert!(!attack.defends_parent());
        assert!(defend.defends_parent());
        assert_eq!(defend.value_bytes(), [7u8; 32]);
    }
}

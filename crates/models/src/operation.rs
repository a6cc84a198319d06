use std::fmt;

use serde::{Deserialize, Serialize};

/// CRUD operation, derived from the HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    /// Permission letter used in entity and field grant strings.
    pub fn letter(&self) -> char {
        match self {
            Operation::Create => 'C',
            Operation::Read => 'R',
            Operation::Update => 'U',
            Operation::Delete => 'D',
        }
    }

    pub fn from_letter(letter: char) -> Option<Operation> {
        match letter {
            'C' => Some(Operation::Create),
            'R' => Some(Operation::Read),
            'U' => Some(Operation::Update),
            'D' => Some(Operation::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_letter(op.letter()), Some(op));
        }
        assert_eq!(Operation::from_letter('X'), None);
    }

    #[test]
    fn displays_as_letter() {
        assert_eq!(Operation::Update.to_string(), "U");
    }
}

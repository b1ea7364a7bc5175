use models::UserRecord;

/// Outcome of a lookup. Absence is a normal result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(UserRecord),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool { matches!(self, Lookup::Found(_)) }

    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            Lookup::Found(user) => Some(user),
            Lookup::NotFound => None,
        }
    }

    pub fn into_user(self) -> Option<UserRecord> {
        match self {
            Lookup::Found(user) => Some(user),
            Lookup::NotFound => None,
        }
    }
}

impl From<Option<UserRecord>> for Lookup {
    fn from(user: Option<UserRecord>) -> Self {
        user.map(Lookup::Found).unwrap_or(Lookup::NotFound)
    }
}

/// What `remove` deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalReport {
    pub user_id: String,
    pub strategy_keys_removed: Vec<String>,
}

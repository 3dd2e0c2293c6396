use socialgraph_core::{Filter, PagingPolicy, TypeTag};

/// Object types of the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TwitterType {
    User,
    Tweet,
    Place,
}

impl TwitterType {
    pub const ALL: [TwitterType; 3] = [TwitterType::User, TwitterType::Tweet, TwitterType::Place];

    pub fn tag(self) -> TypeTag {
        TypeTag(self as u32 + 1)
    }

    pub fn from_tag(tag: TypeTag) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }
}

impl From<TwitterType> for TypeTag {
    fn from(t: TwitterType) -> Self {
        t.tag()
    }
}

/// Related-content endpoints of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TwitterConnection {
    Friends,
    Followers,
    /// Tweets the user wrote.
    Tweets,
    /// The signed-in user's home timeline.
    Home,
}

const CONNECTION_BASE: u32 = 100;

impl TwitterConnection {
    pub const ALL: [TwitterConnection; 4] = [
        TwitterConnection::Friends,
        TwitterConnection::Followers,
        TwitterConnection::Tweets,
        TwitterConnection::Home,
    ];

    pub fn tag(self) -> TypeTag {
        TypeTag(CONNECTION_BASE + self as u32 + 1)
    }

    pub fn from_tag(tag: TypeTag) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Endpoint path below the API root.
    pub fn name(self) -> &'static str {
        match self {
            TwitterConnection::Friends => "friends/list.json",
            TwitterConnection::Followers => "followers/list.json",
            TwitterConnection::Tweets => "statuses/user_timeline.json",
            TwitterConnection::Home => "statuses/home_timeline.json",
        }
    }

    pub fn item_type(self) -> TwitterType {
        match self {
            TwitterConnection::Friends | TwitterConnection::Followers => TwitterType::User,
            TwitterConnection::Tweets | TwitterConnection::Home => TwitterType::Tweet,
        }
    }

    pub fn is_timeline(self) -> bool {
        self.item_type() == TwitterType::Tweet
    }

    /// Every endpoint answers on its own path, so a node takes one filter.
    pub fn is_exclusive(self) -> bool {
        true
    }

    /// User lists announce their cursors; timelines always offer a newer and
    /// an older page until one comes back empty.
    pub fn default_policy(self) -> PagingPolicy {
        if self.is_timeline() {
            PagingPolicy::AlwaysMore
        } else {
            PagingPolicy::Reported
        }
    }

    pub fn filter(self) -> Filter {
        Filter::new(self.tag())
    }
}

impl From<TwitterConnection> for TypeTag {
    fn from(c: TwitterConnection) -> Self {
        c.tag()
    }
}

use socialgraph_core::{Filter, PagingPolicy, TypeTag};

/// Object types of the Graph API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacebookType {
    User,
    Album,
    Photo,
    Comment,
    Like,
    Post,
    Notification,
    PhotoTag,
    Event,
    Location,
    Picture,
}

impl FacebookType {
    pub const ALL: [FacebookType; 11] = [
        FacebookType::User,
        FacebookType::Album,
        FacebookType::Photo,
        FacebookType::Comment,
        FacebookType::Like,
        FacebookType::Post,
        FacebookType::Notification,
        FacebookType::PhotoTag,
        FacebookType::Event,
        FacebookType::Location,
        FacebookType::Picture,
    ];

    pub fn tag(self) -> TypeTag {
        TypeTag(self as u32 + 1)
    }

    pub fn from_tag(tag: TypeTag) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Parses the `metadata.type` value of a reply.
    pub fn from_metadata(name: &str) -> Option<Self> {
        let t = match name {
            "user" => FacebookType::User,
            "album" => FacebookType::Album,
            "photo" => FacebookType::Photo,
            "comment" => FacebookType::Comment,
            "post" | "status" | "link" => FacebookType::Post,
            "notification" => FacebookType::Notification,
            "event" => FacebookType::Event,
            "location" | "page" => FacebookType::Location,
            _ => return None,
        };
        Some(t)
    }

    /// Whether objects of this type carry a stable identifier.
    pub fn is_identifiable(self) -> bool {
        !matches!(self, FacebookType::Like | FacebookType::PhotoTag | FacebookType::Picture)
    }
}

impl From<FacebookType> for TypeTag {
    fn from(t: FacebookType) -> Self {
        t.tag()
    }
}

/// Related-content edges of the Graph API.
///
/// Connection tags live in their own range so two edges yielding the same
/// item type (feed and home) stay distinct in filters and paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacebookConnection {
    Likes,
    Comments,
    Tags,
    Photos,
    Albums,
    Friends,
    Notifications,
    Feed,
    Home,
    Picture,
    Locations,
    Events,
}

const CONNECTION_BASE: u32 = 100;

impl FacebookConnection {
    pub const ALL: [FacebookConnection; 12] = [
        FacebookConnection::Likes,
        FacebookConnection::Comments,
        FacebookConnection::Tags,
        FacebookConnection::Photos,
        FacebookConnection::Albums,
        FacebookConnection::Friends,
        FacebookConnection::Notifications,
        FacebookConnection::Feed,
        FacebookConnection::Home,
        FacebookConnection::Picture,
        FacebookConnection::Locations,
        FacebookConnection::Events,
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

    pub fn name(self) -> &'static str {
        match self {
            FacebookConnection::Likes => "likes",
            FacebookConnection::Comments => "comments",
            FacebookConnection::Tags => "tags",
            FacebookConnection::Photos => "photos",
            FacebookConnection::Albums => "albums",
            FacebookConnection::Friends => "friends",
            FacebookConnection::Notifications => "notifications",
            FacebookConnection::Feed => "feed",
            FacebookConnection::Home => "home",
            FacebookConnection::Picture => "picture",
            FacebookConnection::Locations => "locations",
            FacebookConnection::Events => "events",
        }
    }

    pub fn item_type(self) -> FacebookType {
        match self {
            FacebookConnection::Likes => FacebookType::Like,
            FacebookConnection::Comments => FacebookType::Comment,
            FacebookConnection::Tags => FacebookType::PhotoTag,
            FacebookConnection::Photos => FacebookType::Photo,
            FacebookConnection::Albums => FacebookType::Album,
            FacebookConnection::Friends => FacebookType::User,
            FacebookConnection::Notifications => FacebookType::Notification,
            FacebookConnection::Feed | FacebookConnection::Home => FacebookType::Post,
            FacebookConnection::Picture => FacebookType::Picture,
            FacebookConnection::Locations => FacebookType::Location,
            FacebookConnection::Events => FacebookType::Event,
        }
    }

    /// Notifications cannot be field-expanded and are fetched on their own path.
    pub fn is_exclusive(self) -> bool {
        self == FacebookConnection::Notifications
    }

    pub fn default_policy(self) -> PagingPolicy {
        match self {
            FacebookConnection::Comments => PagingPolicy::AlwaysMore,
            FacebookConnection::Likes => PagingPolicy::UntilEmpty,
            _ => PagingPolicy::Reported,
        }
    }

    /// A filter selecting this connection.
    pub fn filter(self) -> Filter {
        Filter::new(self.tag())
    }
}

impl From<FacebookConnection> for TypeTag {
    fn from(c: FacebookConnection) -> Self {
        c.tag()
    }
}

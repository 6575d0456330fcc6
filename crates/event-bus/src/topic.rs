//! Topic families.

use common::UserId;
use domain::ProductId;

use crate::BusError;

/// A named channel on the bus.
///
/// String forms: `product:<id>`, `user:<uuid>` and `admin:*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Stock changes of one product.
    Product(ProductId),
    /// Order and payment updates for one user.
    User(UserId),
    /// Aggregate feed: new orders, status changes, low-stock alerts.
    Admin,
}

impl Topic {
    pub fn product(id: impl Into<ProductId>) -> Self {
        Topic::Product(id.into())
    }

    pub fn family(&self) -> &'static str {
        match self {
            Topic::Product(_) => "product",
            Topic::User(_) => "user",
            Topic::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Product(id) => write!(f, "product:{id}"),
            Topic::User(id) => write!(f, "user:{id}"),
            Topic::Admin => write!(f, "admin:*"),
        }
    }
}

impl std::str::FromStr for Topic {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BusError::InvalidTopic(s.to_string());
        let (family, key) = s.split_once(':').ok_or_else(invalid)?;

        match family {
            "product" if !key.is_empty() => Ok(Topic::Product(ProductId::new(key))),
            "user" => key.parse().map(Topic::User).map_err(|_| invalid()),
            "admin" if key == "*" => Ok(Topic::Admin),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Topic::product("SKU-1").to_string(), "product:SKU-1");
        assert_eq!(Topic::Admin.to_string(), "admin:*");

        let user = UserId::new();
        assert_eq!(Topic::User(user).to_string(), format!("user:{user}"));
    }

    #[test]
    fn test_parse_roundtrip() {
        let user = UserId::new();
        for topic in [Topic::product("SKU-1"), Topic::User(user), Topic::Admin] {
            assert_eq!(topic.to_string().parse::<Topic>().unwrap(), topic);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_forms() {
        for bad in ["", "product:", "user:not-a-uuid", "admin:42", "orders:1", "admin"] {
            assert_eq!(
                bad.parse::<Topic>(),
                Err(BusError::InvalidTopic(bad.to_string())),
                "{bad}"
            );
        }
    }
}

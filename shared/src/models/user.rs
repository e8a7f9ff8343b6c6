//! User accounts and badge ranks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownChoice;

/// Number of posts needed to climb one badge tier
pub const POSTS_PER_BADGE_TIER: i64 = 10;

/// A user account as exposed by the API (no credentials)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub badge_rank: BadgeRank,
    pub date_joined: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Access to the staff management area
    pub fn has_module_perms(&self) -> bool {
        self.is_superuser || self.is_staff
    }

    pub fn home(&self) -> HomeDestination {
        HomeDestination::for_staff_flag(self.has_module_perms())
    }
}

/// Where a signed-in user lands after login
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HomeDestination {
    AdminHome,
    UserHome,
}

impl HomeDestination {
    pub fn for_staff_flag(is_staff: bool) -> Self {
        if is_staff {
            HomeDestination::AdminHome
        } else {
            HomeDestination::UserHome
        }
    }
}

/// Cosmetic tier awarded for reporting activity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum BadgeRank {
    #[default]
    None,
    Bronze,
    Silver,
    Gold,
    Rainbow,
}

impl BadgeRank {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeRank::None => "none",
            BadgeRank::Bronze => "bronze",
            BadgeRank::Silver => "silver",
            BadgeRank::Gold => "gold",
            BadgeRank::Rainbow => "rainbow",
        }
    }

    /// Japanese display label
    pub fn label_ja(&self) -> &'static str {
        match self {
            BadgeRank::None => "なし",
            BadgeRank::Bronze => "銅バッジ",
            BadgeRank::Silver => "銀バッジ",
            BadgeRank::Gold => "金バッジ",
            BadgeRank::Rainbow => "虹バッジ",
        }
    }

    /// Badge earned for a given number of posts: one tier per ten posts
    pub fn for_post_count(count: i64) -> Self {
        match count.max(0) / POSTS_PER_BADGE_TIER {
            0 => BadgeRank::None,
            1 => BadgeRank::Bronze,
            2 => BadgeRank::Silver,
            3 => BadgeRank::Gold,
            _ => BadgeRank::Rainbow,
        }
    }
}

impl std::fmt::Display for BadgeRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label_ja())
    }
}

impl std::str::FromStr for BadgeRank {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(BadgeRank::None),
            "bronze" => Ok(BadgeRank::Bronze),
            "silver" => Ok(BadgeRank::Silver),
            "gold" => Ok(BadgeRank::Gold),
            "rainbow" => Ok(BadgeRank::Rainbow),
            other => Err(UnknownChoice {
                kind: "badge_rank",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_tiers() {
        assert_eq!(BadgeRank::for_post_count(0), BadgeRank::None);
        assert_eq!(BadgeRank::for_post_count(9), BadgeRank::None);
        assert_eq!(BadgeRank::for_post_count(10), BadgeRank::Bronze);
        assert_eq!(BadgeRank::for_post_count(19), BadgeRank::Bronze);
        assert_eq!(BadgeRank::for_post_count(20), BadgeRank::Silver);
        assert_eq!(BadgeRank::for_post_count(30), BadgeRank::Gold);
        assert_eq!(BadgeRank::for_post_count(40), BadgeRank::Rainbow);
        assert_eq!(BadgeRank::for_post_count(1000), BadgeRank::Rainbow);
    }

    #[test]
    fn test_negative_count_has_no_badge() {
        assert_eq!(BadgeRank::for_post_count(-5), BadgeRank::None);
    }

    #[test]
    fn test_badge_parse() {
        assert_eq!("gold".parse::<BadgeRank>().unwrap(), BadgeRank::Gold);
        assert!("platinum".parse::<BadgeRank>().is_err());
    }

    #[test]
    fn test_permissions() {
        let mut user = User {
            id: Uuid::nil(),
            username: "hanako".to_string(),
            email: "hanako@example.jp".to_string(),
            is_staff: false,
            is_superuser: false,
            badge_rank: BadgeRank::None,
            date_joined: Utc::now(),
            last_login_at: None,
        };
        assert!(!user.has_module_perms());
        assert_eq!(user.home(), HomeDestination::UserHome);

        user.is_staff = true;
        assert!(user.has_module_perms());
        assert_eq!(user.home(), HomeDestination::AdminHome);

        user.is_staff = false;
        user.is_superuser = true;
        assert!(user.has_module_perms());
        assert_eq!(user.home(), HomeDestination::AdminHome);
    }
}

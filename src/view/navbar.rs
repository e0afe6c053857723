//! Navigation menu contents.

use crate::client::{QueryClient, Session, SessionSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Navigate(&'static str),
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: MenuAction,
    /// Counter shown next to the label, if any.
    pub badge: Option<u64>,
}

impl MenuItem {
    fn link(label: &'static str, path: &'static str) -> Self {
        MenuItem {
            label,
            action: MenuAction::Navigate(path),
            badge: None,
        }
    }
}

const MAIN_LINKS: [(&str, &str); 4] = [
    ("Home", "/"),
    ("Catalog", "/cars"),
    ("About", "/about"),
    ("Contact", "/contact"),
];

/// The menu for the current session.
pub fn build_menu(session: &SessionSnapshot) -> Vec<MenuItem> {
    let mut items: Vec<MenuItem> = MAIN_LINKS
        .iter()
        .map(|&(label, path)| MenuItem::link(label, path))
        .collect();

    if session.is_authenticated() {
        items.push(MenuItem {
            badge: Some(session.favorite_count),
            ..MenuItem::link("Favorites", "/favorites")
        });
        items.push(MenuItem::link("Profile", "/profile"));
        items.push(MenuItem::link("Orders", "/orders"));
        if session.is_admin() {
            items.push(MenuItem::link("Admin", "/admin"));
        }
        items.push(MenuItem {
            label: "Logout",
            action: MenuAction::Logout,
            badge: None,
        });
    } else {
        items.push(MenuItem::link("Login", "/login"));
        items.push(MenuItem::link("Register", "/register"));
    }
    items
}

/// Logs out, drops cached per-user data and returns where to navigate next.
pub async fn logout(session: &Session, queries: &QueryClient) -> &'static str {
    session.logout().await;
    queries.clear();
    "/"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::client::cache::favorites_key;
    use crate::client::{ApiClient, MemoryCredentialStore};
    use crate::models::{Role, User};

    fn labels(items: &[MenuItem]) -> Vec<&'static str> {
        items.iter().map(|i| i.label).collect()
    }

    #[test]
    fn test_anonymous_menu() {
        let menu = build_menu(&SessionSnapshot {
            user: None,
            loading: false,
            favorite_count: 0,
        });
        assert_eq!(
            labels(&menu),
            vec!["Home", "Catalog", "About", "Contact", "Login", "Register"]
        );
    }

    #[test]
    fn test_customer_menu_has_favorites_badge() {
        let menu = build_menu(&SessionSnapshot {
            user: Some(User::new("A".into(), "a@b.kz".into(), None, Role::Customer)),
            loading: false,
            favorite_count: 3,
        });
        assert!(!labels(&menu).contains(&"Admin"));
        let favorites = menu.iter().find(|i| i.label == "Favorites").unwrap();
        assert_eq!(favorites.badge, Some(3));
        assert_eq!(menu.last().map(|i| &i.action), Some(&MenuAction::Logout));
    }

    #[test]
    fn test_admin_menu() {
        let menu = build_menu(&SessionSnapshot {
            user: Some(User::new("A".into(), "a@b.kz".into(), None, Role::Admin)),
            loading: false,
            favorite_count: 0,
        });
        assert!(labels(&menu).contains(&"Admin"));
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_caches() {
        let store = Arc::new(MemoryCredentialStore::with_credential("T"));
        let session = Session::new(ApiClient::new("http://127.0.0.1:9"), store);
        let queries = QueryClient::default();
        queries.favorites.insert(favorites_key("u1"), Vec::new());

        assert_eq!(logout(&session, &queries).await, "/");
        assert!(queries.favorites.get(&favorites_key("u1")).is_none());
        assert!(session.credential().is_none());
        assert!(!session.snapshot().is_authenticated());
    }
}

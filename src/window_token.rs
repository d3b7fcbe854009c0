
use {
    crate::{
        backend::{Window, WindowId},
        utils::copyhashmap::CopyHashMap,
    },
    smallvec::SmallVec,
    std::{
        cell::{Cell, RefCell},
        rc::{Rc, Weak},
    },
};

/// The opaque identity a client registers its windows under.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TokenId(u64);

impl TokenId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

struct TokenChild {
    id: WindowId,
    window: Weak<dyn Window>,
}

/// Groups the windows of one client identity.
///
/// The token does not keep its windows alive.
pub struct WindowToken {
    token: TokenId,
    ty: i32,
    display_id: i32,
    children: RefCell<SmallVec<[TokenChild; 2]>>,
    client_visible: Cell<bool>,
}

impl WindowToken {
    pub fn new(token: TokenId, ty: i32, display_id: i32) -> Self {
        Self {
            token,
            ty,
            display_id,
            children: Default::default(),
            client_visible: Cell::new(false),
        }
    }

    pub fn token(&self) -> TokenId {
        self.token
    }

    pub fn ty(&self) -> i32 {
        self.ty
    }

    pub fn display_id(&self) -> i32 {
        self.display_id
    }

    /// Appends the window. Duplicates are not filtered.
    pub fn add_window(&self, window: &Rc<dyn Window>) {
        self.children.borrow_mut().push(TokenChild {
            id: window.id(),
            window: Rc::downgrade(window),
        });
    }

    /// Removes every entry for the window and returns whether any existed.
    pub fn remove_window(&self, id: WindowId) -> bool {
        let mut children = self.children.borrow_mut();
        let len = children.len();
        children.retain(|c| c.id != id);
        children.len() != len
    }

    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    /// The ids of the windows in insertion order.
    pub fn window_ids(&self) -> Vec<WindowId> {
        self.children.borrow().iter().map(|c| c.id).collect()
    }

    /// The windows that are still alive, in insertion order.
    pub fn windows(&self) -> Vec<Rc<dyn Window>> {
        self.children
            .borrow()
            .iter()
            .filter_map(|c| c.window.upgrade())
            .collect()
    }

    pub fn is_client_visible(&self) -> bool {
        self.client_visible.get()
    }

    pub fn set_client_visible(&self, client_visible: bool) {
        if self.client_visible.replace(client_visible) != client_visible {
            log::debug!(
                "Token {:?} is now {}",
                self.token,
                if client_visible { "visible" } else { "invisible" }
            );
        }
    }
}

/// The service-side owner of all window tokens.
#[derive(Default)]
pub struct TokenRegistry {
    tokens: CopyHashMap<TokenId, Rc<WindowToken>>,
}

impl TokenRegistry {
    pub fn get(&self, token: TokenId) -> Option<Rc<WindowToken>> {
        self.tokens.get(&token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Adds the window to the token, creating the token on first use. The
    /// type and display of an existing token are left unchanged.
    pub fn add_window(
        &self,
        token: TokenId,
        ty: i32,
        display_id: i32,
        window: &Rc<dyn Window>,
    ) -> Rc<WindowToken> {
        let wt = match self.tokens.get(&token) {
            Some(wt) => wt,
            None => {
                let wt = Rc::new(WindowToken::new(token, ty, display_id));
                self.tokens.set(token, wt.clone());
                wt
            }
        };
        wt.add_window(window);
        self.window_visibility_changed(token);
        wt
    }

    /// Removes the window and destroys the token once it is empty. Returns
    /// whether the token was destroyed.
    pub fn remove_window(&self, token: TokenId, window: WindowId) -> bool {
        let Some(wt) = self.tokens.get(&token) else {
            return false;
        };
        wt.remove_window(window);
        if wt.is_empty() {
            self.tokens.remove(&token);
            return true;
        }
        self.window_visibility_changed(token);
        false
    }

    /// Recomputes the aggregate visibility of the token from its live
    /// windows.
    pub fn window_visibility_changed(&self, token: TokenId) {
        let Some(wt) = self.tokens.get(&token) else {
            return;
        };
        let visible = wt.windows().iter().any(|w| w.client_visible());
        wt.set_client_visible(visible);
    }
}

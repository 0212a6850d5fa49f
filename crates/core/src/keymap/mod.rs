//! Keyboard quick-action layer
//!
//! Translates raw key events into the same operations the pointer UI
//! invokes. The dispatcher never mutates anything itself; it resolves a
//! key against focus context, guard state, and the cart cursor, and hands
//! back the action for the host to execute. That keeps keyboard and
//! pointer paths guaranteed-identical at the model layer.

use std::sync::{Arc, Mutex, MutexGuard};

use tillpoint_domain::constants::BULK_QUANTITY_STEP;

use crate::cart::CartModel;

/// Decoded key identity, separate from modifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
    Delete,
    Backspace,
    ArrowUp,
    ArrowDown,
}

/// A single key press as received from the host shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub ctrl: bool,
}

impl KeyEvent {
    pub fn plain(key: Key) -> Self {
        Self { key, ctrl: false }
    }

    pub fn ctrl(key: Key) -> Self {
        Self { key, ctrl: true }
    }
}

/// Where keyboard focus currently sits.
///
/// While the operator is typing into a text field, single-letter chords
/// must not fire; only the search chord and escape survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusContext {
    General,
    TextEntry,
}

/// Guard state shared verbatim with the pointer UI's button disablement
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchGuards {
    pub cart_empty: bool,
    pub submission_in_flight: bool,
}

/// Action resolved from a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickAction {
    FocusSearch,
    ClearSearch,
    ToggleOrderType,
    SubmitCash,
    SubmitTerminalCard,
    SubmitManualCard,
    AdjustQuantity { line_id: String, delta: i64 },
    RemoveLine { line_id: String },
    CursorMoved { line_id: String },
}

/// Resolves key events against the cart cursor and guard state.
///
/// The cursor follows explicit arrow-key navigation; when none has been
/// made it falls back to the cart's most recently touched line.
pub struct QuickActionDispatcher {
    cart: Arc<Mutex<CartModel>>,
    cursor: Mutex<Option<String>>,
}

impl QuickActionDispatcher {
    pub fn new(cart: Arc<Mutex<CartModel>>) -> Self {
        Self { cart, cursor: Mutex::new(None) }
    }

    /// Resolve one key press. `None` means the event is not a quick action
    /// in this context and should fall through to the host.
    pub fn dispatch(
        &self,
        event: KeyEvent,
        focus: FocusContext,
        guards: DispatchGuards,
    ) -> Option<QuickAction> {
        // The search chord is the one binding honored everywhere, so the
        // operator can always reach the scanner/search box.
        if event.ctrl && event.key == Key::Char('k') {
            return Some(QuickAction::FocusSearch);
        }

        if focus == FocusContext::TextEntry {
            return match event.key {
                Key::Escape => Some(QuickAction::ClearSearch),
                _ => None,
            };
        }

        match event.key {
            Key::Char('/') => Some(QuickAction::FocusSearch),
            Key::Escape => Some(QuickAction::ClearSearch),
            Key::Char('o') => Some(QuickAction::ToggleOrderType),
            Key::Char('c') => self.payment(QuickAction::SubmitCash, guards),
            Key::Char('t') => self.payment(QuickAction::SubmitTerminalCard, guards),
            Key::Char('m') => self.payment(QuickAction::SubmitManualCard, guards),
            Key::Char('-') => self.adjust(-1, guards),
            Key::Char('+') | Key::Char('=') => self.adjust(1, guards),
            Key::Char('5') => self.adjust(BULK_QUANTITY_STEP, guards),
            Key::Delete | Key::Backspace => {
                if guards.submission_in_flight {
                    return None;
                }
                let line_id = self.resolved_cursor()?;
                *self.locked_cursor() = None;
                Some(QuickAction::RemoveLine { line_id })
            }
            Key::ArrowUp => self.move_cursor(-1),
            Key::ArrowDown => self.move_cursor(1),
            _ => None,
        }
    }

    /// Point the cursor at a specific line, as when the operator clicks one
    pub fn select_line(&self, line_id: &str) {
        *self.locked_cursor() = Some(line_id.to_string());
    }

    /// Payment chords share the exact guard conditions that disable the
    /// corresponding buttons.
    fn payment(&self, action: QuickAction, guards: DispatchGuards) -> Option<QuickAction> {
        if guards.cart_empty || guards.submission_in_flight {
            return None;
        }
        Some(action)
    }

    fn adjust(&self, delta: i64, guards: DispatchGuards) -> Option<QuickAction> {
        if guards.submission_in_flight {
            return None;
        }
        let line_id = self.resolved_cursor()?;
        Some(QuickAction::AdjustQuantity { line_id, delta })
    }

    fn move_cursor(&self, direction: i64) -> Option<QuickAction> {
        let cart = lock_ignoring_poison(&self.cart);
        let lines = cart.lines();
        if lines.is_empty() {
            return None;
        }

        let mut cursor = self.locked_cursor();
        let current = cursor
            .as_deref()
            .or_else(|| cart.last_touched_line())
            .and_then(|id| lines.iter().position(|l| l.line_id == id));

        let next = match current {
            Some(index) => {
                let moved = index as i64 + direction;
                moved.clamp(0, lines.len() as i64 - 1) as usize
            }
            // No cursor yet: down enters at the top, up at the bottom
            None if direction > 0 => 0,
            None => lines.len() - 1,
        };

        let line_id = lines[next].line_id.clone();
        *cursor = Some(line_id.clone());
        Some(QuickAction::CursorMoved { line_id })
    }

    /// Explicit cursor if it still points at a live line, otherwise the
    /// cart's last touched line.
    fn resolved_cursor(&self) -> Option<String> {
        let cart = lock_ignoring_poison(&self.cart);
        let cursor = self.locked_cursor();
        if let Some(id) = cursor.as_deref() {
            if cart.line(id).is_some() {
                return Some(id.to_string());
            }
        }
        cart.last_touched_line().map(str::to_string)
    }

    fn locked_cursor(&self) -> MutexGuard<'_, Option<String>> {
        match self.cursor.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn lock_ignoring_poison(cart: &Mutex<CartModel>) -> MutexGuard<'_, CartModel> {
    match cart.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

use crate::app::{ApiReply, ApiRequest, LineEditor, ScreenAction, is_submit_key};
use crate::domain::{Customer, NewCustomer};
use crossterm::event::{KeyCode, KeyEvent};

pub const LOAD_ERROR: &str = "Failed to load customers";
pub const ADD_ERROR: &str = "Failed to add customer";
pub const DELETE_ERROR: &str = "Failed to delete customer";
pub const REQUIRED_ERROR: &str = "Name and email are required";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CustomersFocus {
    Name,
    Email,
    TotalSpend,
    Visits,
    Table,
}

impl CustomersFocus {
    const ORDER: [CustomersFocus; 5] = [
        Self::Name,
        Self::Email,
        Self::TotalSpend,
        Self::Visits,
        Self::Table,
    ];

    fn step(self, forward: bool) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let len = Self::ORDER.len();
        let next = if forward {
            (index + 1) % len
        } else {
            (index + len - 1) % len
        };
        Self::ORDER[next]
    }
}

#[derive(Clone, Debug)]
pub struct CustomersScreen {
    pub customers: Vec<Customer>,
    pub loading: bool,
    pub error: Option<String>,
    pub name: LineEditor,
    pub email: LineEditor,
    pub total_spend: LineEditor,
    pub visits: LineEditor,
    pub focus: CustomersFocus,
    pub selected: usize,
    pub busy: bool,
}

impl CustomersScreen {
    pub fn new() -> Self {
        Self {
            customers: Vec::new(),
            loading: false,
            error: None,
            name: LineEditor::new(),
            email: LineEditor::new(),
            total_spend: LineEditor::new(),
            visits: LineEditor::new(),
            focus: CustomersFocus::Name,
            selected: 0,
            busy: false,
        }
    }

    pub fn begin_fetch(&mut self) -> ApiRequest {
        self.loading = true;
        self.error = None;
        ApiRequest::ListCustomers
    }

    pub fn on_key(&mut self, key: KeyEvent) -> ScreenAction {
        if is_submit_key(key) {
            return self.submit();
        }
        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.step(true);
                return ScreenAction::None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.step(false);
                return ScreenAction::None;
            }
            _ => {}
        }

        if self.focus == CustomersFocus::Table {
            return self.on_table_key(key);
        }

        if key.code == KeyCode::Enter {
            return self.submit();
        }
        if let Some(editor) = self.focused_editor() {
            editor.handle_key(key);
        }
        ScreenAction::None
    }

    pub fn on_paste(&mut self, text: &str) {
        if let Some(editor) = self.focused_editor() {
            editor.insert_str(text);
        }
    }

    pub fn on_reply(&mut self, reply: ApiReply) -> ScreenAction {
        match reply {
            ApiReply::Customers(Ok(customers)) => {
                self.customers = customers;
                self.loading = false;
                self.selected = self.selected.min(self.customers.len().saturating_sub(1));
                ScreenAction::None
            }
            ApiReply::Customers(Err(_)) => {
                self.loading = false;
                self.error = Some(LOAD_ERROR.to_string());
                ScreenAction::None
            }
            ApiReply::CustomerCreated(Ok(())) => {
                self.busy = false;
                self.name.clear();
                self.email.clear();
                self.total_spend.clear();
                self.visits.clear();
                ScreenAction::Request(self.begin_fetch())
            }
            ApiReply::CustomerCreated(Err(_)) => {
                self.busy = false;
                self.error = Some(ADD_ERROR.to_string());
                ScreenAction::None
            }
            ApiReply::CustomerDeleted(Ok(())) => {
                self.busy = false;
                ScreenAction::Request(self.begin_fetch())
            }
            ApiReply::CustomerDeleted(Err(_)) => {
                self.busy = false;
                self.error = Some(DELETE_ERROR.to_string());
                ScreenAction::None
            }
            _ => ScreenAction::None,
        }
    }

    fn on_table_key(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                ScreenAction::None
            }
            KeyCode::Down => {
                if self.selected + 1 < self.customers.len() {
                    self.selected += 1;
                }
                ScreenAction::None
            }
            KeyCode::Delete | KeyCode::Char('d') => {
                if self.busy {
                    return ScreenAction::None;
                }
                let Some(customer) = self.customers.get(self.selected) else {
                    return ScreenAction::None;
                };
                let id = customer.id.clone();
                self.busy = true;
                ScreenAction::Request(ApiRequest::DeleteCustomer { id })
            }
            _ => ScreenAction::None,
        }
    }

    fn submit(&mut self) -> ScreenAction {
        if self.busy {
            return ScreenAction::None;
        }
        if self.name.is_blank() || self.email.is_blank() {
            self.error = Some(REQUIRED_ERROR.to_string());
            return ScreenAction::None;
        }
        self.busy = true;
        self.error = None;
        ScreenAction::Request(ApiRequest::CreateCustomer(NewCustomer::from_form(
            &self.name.text,
            &self.email.text,
            &self.total_spend.text,
            &self.visits.text,
        )))
    }

    fn focused_editor(&mut self) -> Option<&mut LineEditor> {
        match self.focus {
            CustomersFocus::Name => Some(&mut self.name),
            CustomersFocus::Email => Some(&mut self.email),
            CustomersFocus::TotalSpend => Some(&mut self.total_spend),
            CustomersFocus::Visits => Some(&mut self.visits),
            CustomersFocus::Table => None,
        }
    }
}

impl Default for CustomersScreen {
    fn default() -> Self {
        Self::new()
    }
}

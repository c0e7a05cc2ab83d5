//! This module provides ways to tweak mocked stores, so that they can return errors on some tests

use crate::error::BoxError;

/// This stores some behaviour tweaks, that describe how a mocked instance will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    /// A message the failures will carry (defaults to a generic message)
    pub error_message: Option<String>,

    // From the CalendarStore trait
    pub list_calendars_behaviour: (u32, u32),
    pub create_calendar_behaviour: (u32, u32),
    pub list_events_behaviour: (u32, u32),
    pub insert_event_behaviour: (u32, u32),
    pub update_event_behaviour: (u32, u32),
    pub move_event_behaviour: (u32, u32),
    pub delete_event_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            error_message: None,
            list_calendars_behaviour: (0, n_fails),
            create_calendar_behaviour: (0, n_fails),
            list_events_behaviour: (0, n_fails),
            insert_event_behaviour: (0, n_fails),
            update_event_behaviour: (0, n_fails),
            move_event_behaviour: (0, n_fails),
            delete_event_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_list_calendars(&mut self) -> Result<(), BoxError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.list_calendars_behaviour, "list_calendars", &self.error_message)
    }
    pub fn can_create_calendar(&mut self) -> Result<(), BoxError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.create_calendar_behaviour, "create_calendar", &self.error_message)
    }
    pub fn can_list_events(&mut self) -> Result<(), BoxError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.list_events_behaviour, "list_events", &self.error_message)
    }
    pub fn can_insert_event(&mut self) -> Result<(), BoxError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.insert_event_behaviour, "insert_event", &self.error_message)
    }
    pub fn can_update_event(&mut self) -> Result<(), BoxError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.update_event_behaviour, "update_event", &self.error_message)
    }
    pub fn can_move_event(&mut self) -> Result<(), BoxError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.move_event_behaviour, "move_event", &self.error_message)
    }
    pub fn can_delete_event(&mut self) -> Result<(), BoxError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.delete_event_behaviour, "delete_event", &self.error_message)
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str, message: &Option<String>) -> Result<(), BoxError> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 = value.0 - 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else {
        if remaining_failures > 0 {
            value.1 = value.1 - 1;
            log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
            match message {
                Some(msg) => Err(msg.clone().into()),
                None => Err(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value).into()),
            }
        } else {
            log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_behaviour() {
        let mut ok = MockBehaviour::new();
        assert!(ok.can_list_calendars().is_ok());
        assert!(ok.can_list_calendars().is_ok());
        assert!(ok.can_insert_event().is_ok());
        assert!(ok.can_delete_event().is_ok());

        let mut now = MockBehaviour::fail_now(2);
        assert!(now.can_list_calendars().is_err());
        assert!(now.can_create_calendar().is_err());
        assert!(now.can_create_calendar().is_err());
        assert!(now.can_list_calendars().is_err());
        assert!(now.can_list_calendars().is_ok());
        assert!(now.can_list_calendars().is_ok());
        assert!(now.can_create_calendar().is_ok());

        let mut custom = MockBehaviour{
            insert_event_behaviour: (1,2),
            error_message: Some("Required".to_string()),
            ..MockBehaviour::default()
        };
        assert!(custom.can_insert_event().is_ok());
        assert_eq!(custom.can_insert_event().unwrap_err().to_string(), "Required");
        assert!(custom.can_insert_event().is_err());
        assert!(custom.can_insert_event().is_ok());

        custom.insert_event_behaviour = (0, 1);
        custom.suspend();
        assert!(custom.can_insert_event().is_ok());
        custom.resume();
        assert!(custom.can_insert_event().is_err());
    }
}

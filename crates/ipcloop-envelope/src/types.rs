//! Message type numbering.
//!
//! Types 0-8999 are application-defined requests.
//! Types 9000-9999 are reserved for infrastructure.
//! Types 10000 and above are replies: `request type + REPLY_BASE`.

/// Offset added to a request type to form its reply type.
pub const REPLY_BASE: i32 = 10000;

/// Watchdog heartbeat, sent by a process to its own channel.
pub const WATCHDOG: i32 = 9000;

/// First reserved infrastructure type.
pub const RESERVED_START: i32 = 9000;

/// Last application-defined request type.
pub const APP_TYPE_MAX: i32 = RESERVED_START - 1;

/// Coarse classification of a type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Application,
    Reserved,
    Reply,
    Invalid,
}

/// Classify a type tag.
pub fn type_class(msg_type: i32) -> TypeClass {
    match msg_type {
        0..=APP_TYPE_MAX => TypeClass::Application,
        RESERVED_START..=9999 => TypeClass::Reserved,
        REPLY_BASE.. => TypeClass::Reply,
        _ => TypeClass::Invalid,
    }
}

/// Returns a human-readable name for a type tag.
pub fn type_name(msg_type: i32) -> &'static str {
    match msg_type {
        WATCHDOG => "WATCHDOG",
        t if t == WATCHDOG + REPLY_BASE => "WATCHDOG_REPLY",
        t => match type_class(t) {
            TypeClass::Application => "APP",
            TypeClass::Reserved => "RESERVED",
            TypeClass::Reply => "REPLY",
            TypeClass::Invalid => "INVALID",
        },
    }
}

/// Returns true if the tag lives in reply space.
pub fn is_reply(msg_type: i32) -> bool {
    msg_type >= REPLY_BASE
}

/// Returns true if the tag is in the reserved infrastructure range.
pub fn is_reserved(msg_type: i32) -> bool {
    type_class(msg_type) == TypeClass::Reserved
}

/// Returns true if the tag may be sent as a request.
pub fn is_request(msg_type: i32) -> bool {
    matches!(
        type_class(msg_type),
        TypeClass::Application | TypeClass::Reserved
    )
}

/// Reply type for a request type.
pub fn reply_type_for(request_type: i32) -> i32 {
    request_type.saturating_add(REPLY_BASE)
}

/// Request type a reply answers, or `None` if `reply_type` is not a reply.
pub fn request_type_for(reply_type: i32) -> Option<i32> {
    is_reply(reply_type).then(|| reply_type - REPLY_BASE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ranges() {
        assert_eq!(type_class(0), TypeClass::Application);
        assert_eq!(type_class(8999), TypeClass::Application);
        assert_eq!(type_class(9000), TypeClass::Reserved);
        assert_eq!(type_class(9999), TypeClass::Reserved);
        assert_eq!(type_class(10000), TypeClass::Reply);
        assert_eq!(type_class(-1), TypeClass::Invalid);
    }

    #[test]
    fn reply_types_are_offset_by_base() {
        assert_eq!(reply_type_for(5), 10005);
        assert_eq!(reply_type_for(WATCHDOG), 19000);
        assert_eq!(request_type_for(10005), Some(5));
        assert_eq!(request_type_for(42), None);
    }

    #[test]
    fn only_request_ranges_are_requests() {
        assert!(is_request(7));
        assert!(is_request(WATCHDOG));
        assert!(!is_request(REPLY_BASE));
        assert!(!is_request(-3));
        assert!(is_reserved(WATCHDOG));
        assert!(!is_reserved(7));
    }

    #[test]
    fn names() {
        assert_eq!(type_name(WATCHDOG), "WATCHDOG");
        assert_eq!(type_name(19000), "WATCHDOG_REPLY");
        assert_eq!(type_name(12), "APP");
        assert_eq!(type_name(9100), "RESERVED");
        assert_eq!(type_name(10012), "REPLY");
    }
}

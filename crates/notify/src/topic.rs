//! Topic naming.
//!
//! Every topic carries the latest event for its key:
//! `eventstream/<key>/lastEvent`.

const PREFIX: &str = "eventstream";
const LAST_EVENT: &str = "lastEvent";

/// Topic carrying the latest event filed under a destination.
pub fn destination_topic(destination_id: &str) -> String {
    format!("{PREFIX}/{destination_id}/{LAST_EVENT}")
}

/// Topic carrying the latest event handled by a stream instance.
pub fn stream_topic(stream_id: &str) -> String {
    format!("{PREFIX}/{stream_id}/{LAST_EVENT}")
}

/// Topic used by connectivity probes; never carries events.
pub fn probe_topic(stream_id: &str) -> String {
    format!("{PREFIX}/{stream_id}/test")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_are_keyed() {
        assert_eq!(destination_topic("dev-1"), "eventstream/dev-1/lastEvent");
        assert_eq!(stream_topic("srv"), "eventstream/srv/lastEvent");
        assert_eq!(probe_topic("srv"), "eventstream/srv/test");
    }
}

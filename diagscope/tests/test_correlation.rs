use diagscope::cache::{ValueCache, NO_DATA};
use diagscope::catalog::Catalog;
use diagscope::correlator::{Correlation, Correlator};
use diagscope::domain::{FrameError, SignalKey};
use diagscope_common::Frame;

const RPM: SignalKey = SignalKey::new(0x7E0, 0x01, 0x0C);

fn correlate(frames: &[Frame]) -> (Correlator, ValueCache) {
    let catalog = Catalog::standard();
    let mut cache = ValueCache::new();
    let mut correlator = Correlator::new();
    for frame in frames {
        correlator.process_frame(frame, &catalog, &mut cache);
    }
    (correlator, cache)
}

#[test]
fn test_engine_speed_response_lands_under_request_address() {
    let (correlator, cache) = correlate(&[Frame::new(0x7E8, vec![0x04, 0x41, 0x0C, 0x1A, 0xF8])]);

    assert_eq!(cache.get(&RPM), Some("1726 rpm"));
    assert_eq!(cache.get(&SignalKey::new(0x7E8, 0x01, 0x0C)), None);
    assert_eq!(correlator.stats.updated, 1);
}

#[test]
fn test_padding_after_declared_length_is_ignored() {
    let frame = Frame::new(0x7E8, vec![0x04, 0x41, 0x0C, 0x1A, 0xF8, 0xAA, 0xAA, 0xAA]);
    let (_, cache) = correlate(&[frame]);
    assert_eq!(cache.get(&RPM), Some("1726 rpm"));
}

#[test]
fn test_malformed_frames_leave_cache_untouched() {
    let catalog = Catalog::standard();
    let mut cache = ValueCache::new();
    let mut correlator = Correlator::new();

    let zero_length = Frame::new(0x7E8, vec![0x00, 0x41, 0x0C, 0x1A, 0xF8]);
    assert!(matches!(
        correlator.process_frame(&zero_length, &catalog, &mut cache),
        Correlation::Malformed(FrameError::TooShort { .. })
    ));

    let unknown_service = Frame::new(0x7E8, vec![0x04, 0x99, 0x0C, 0x1A, 0xF8]);
    assert_eq!(
        correlator.process_frame(&unknown_service, &catalog, &mut cache),
        Correlation::Malformed(FrameError::UnknownService(0x99))
    );

    assert!(cache.is_empty());
    assert_eq!(cache.unmatched_count(), 0);
    assert_eq!(cache.display(&RPM), NO_DATA);
    assert_eq!(correlator.stats.malformed, 2);
}

#[test]
fn test_requests_seen_on_the_bus_are_ignored() {
    let (correlator, cache) = correlate(&[Frame::new(0x7E0, vec![0x02, 0x01, 0x0C])]);
    assert!(cache.is_empty());
    assert_eq!(correlator.stats.ignored, 1);
}

#[test]
fn test_later_response_replaces_earlier_value() {
    let (_, cache) = correlate(&[
        Frame::new(0x7E8, vec![0x04, 0x41, 0x0C, 0x1A, 0xF8]),
        Frame::new(0x7E8, vec![0x04, 0x41, 0x0C, 0x0F, 0xA0]),
    ]);
    assert_eq!(cache.get(&RPM), Some("1000 rpm"));
}

use blockstream_types::{Cursor, Response};

/// Cursor carried by a response, if it advances the stream.
///
/// Only `block_scoped_data` messages move the resume point forward. Undo
/// signals, progress and anything else pass through as `None`. The caller owns
/// the accumulated cursor.
pub fn observe(response: &Response) -> Option<Cursor> {
    match response {
        Response::BlockScopedData(data) => Some(data.cursor.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{data, progress, session_init, undo};

    #[test]
    fn test_observe_block_scoped_data() {
        assert_eq!(observe(&data(1, "c1", None)), Some(Cursor::new("c1")));
    }

    #[test]
    fn test_observe_ignores_other_kinds() {
        assert_eq!(observe(&undo(1, "c0")), None);
        assert_eq!(observe(&progress(10, 0)), None);
        assert_eq!(observe(&session_init("trace")), None);
        assert_eq!(observe(&Response::Other), None);
    }

    #[test]
    fn test_folded_cursor_follows_emission_order() {
        let items = vec![
            data(1, "c1", None),
            progress(10, 0),
            data(2, "c2", None),
            undo(1, "c1"),
            data(3, "c3", None),
        ];

        let mut cursor = None;
        let mut history = Vec::new();
        for item in &items {
            if let Some(next) = observe(item) {
                cursor = Some(next);
            }
            history.push(cursor.clone());
        }

        assert_eq!(
            history,
            vec![
                Some(Cursor::new("c1")),
                Some(Cursor::new("c1")),
                Some(Cursor::new("c2")),
                Some(Cursor::new("c2")),
                Some(Cursor::new("c3")),
            ]
        );
    }
}

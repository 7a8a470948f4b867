//! S4: encode a container to a file, decode it back (spec §8).

use std::io::Write;

use carriageway::dson::{DsonObject, DsonValue};

#[test]
fn container_round_trips_through_a_file() {
    let original = DsonObject::container(
        7,
        vec![
            DsonObject::new(1, DsonValue::U32(100)),
            DsonObject::new(2, DsonValue::I64(1000)),
            DsonObject::new(3, DsonValue::F64(100.1)),
            DsonObject::new(4, DsonValue::Str("100.1".to_string())),
        ],
    );
    let bytes = original.encode();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let file_len = file.path().metadata().unwrap().len() as usize;
    let read_back = std::fs::read(file.path()).unwrap();
    let decoded = DsonObject::decode(&read_back).unwrap();

    assert_eq!(decoded.key, 7);
    assert_eq!(decoded.children().len(), 4);

    let keys: Vec<i32> = decoded.children().iter().map(|c| c.key).collect();
    assert_eq!(keys, vec![1, 2, 3, 4]);

    assert_eq!(decoded.find(1).unwrap().value, DsonValue::U32(100));
    assert_eq!(decoded.find(2).unwrap().value, DsonValue::I64(1000));
    assert_eq!(decoded.find(3).unwrap().value, DsonValue::F64(100.1));
    assert_eq!(decoded.find(4).unwrap().value, DsonValue::Str("100.1".to_string()));

    assert_eq!(decoded.all_size(), file_len);
}

//! Cross-checks against a minimal, independent rendition of the classic
//! cdbmake/cdbget algorithms: two slots per record and `h >> 8` probing.

use std::io::Cursor;

use constdb::{Reader, Writer, WriterConfig};

fn djb(key: &[u8]) -> u32 {
    let mut h: u32 = 5381;
    for &c in key {
        h = (h << 5).wrapping_add(h) ^ u32::from(c);
    }
    h
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

fn cdbmake(pairs: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut out = vec![0u8; 2048];
    let mut buckets: Vec<Vec<(u32, u32)>> = vec![Vec::new(); 256];
    for (k, v) in pairs {
        let h = djb(k);
        buckets[(h & 0xff) as usize].push((h, out.len() as u32));
        out.extend_from_slice(&(k.len() as u32).to_le_bytes());
        out.extend_from_slice(&(v.len() as u32).to_le_bytes());
        out.extend_from_slice(k);
        out.extend_from_slice(v);
    }
    let mut header = Vec::with_capacity(2048);
    for entries in &buckets {
        let slots = entries.len() * 2;
        let mut table = vec![(0u32, 0u32); slots];
        for &(h, pos) in entries {
            let mut i = (h >> 8) as usize % slots;
            while table[i].1 != 0 {
                i = (i + 1) % slots;
            }
            table[i] = (h, pos);
        }
        header.extend_from_slice(&(out.len() as u32).to_le_bytes());
        header.extend_from_slice(&(slots as u32).to_le_bytes());
        for (h, pos) in table {
            out.extend_from_slice(&h.to_le_bytes());
            out.extend_from_slice(&pos.to_le_bytes());
        }
    }
    out[..2048].copy_from_slice(&header);
    out
}

fn cdbget(db: &[u8], key: &[u8]) -> Vec<Vec<u8>> {
    let h = djb(key);
    let entry = (h & 0xff) as usize * 8;
    let table = u32_at(db, entry) as usize;
    let slots = u32_at(db, entry + 4) as usize;
    let mut found = Vec::new();
    if slots == 0 {
        return found;
    }
    let mut i = (h >> 8) as usize % slots;
    for _ in 0..slots {
        let at = table + i * 8;
        let pos = u32_at(db, at + 4) as usize;
        if pos == 0 {
            break;
        }
        if u32_at(db, at) == h {
            let klen = u32_at(db, pos) as usize;
            let vlen = u32_at(db, pos + 4) as usize;
            if &db[pos + 8..pos + 8 + klen] == key {
                found.push(db[pos + 8 + klen..pos + 8 + klen + vlen].to_vec());
            }
        }
        i = (i + 1) % slots;
    }
    found
}

const PAIRS: &[(&[u8], &[u8])] = &[
    (b"foo", b"bar"),
    (b"1", b"2"),
    (b"This is a test", b"And a value"),
    (b"Some more", b"5678"),
    (b"Blahrg", b"What is this?"),
    (b"foo2", b"bar2"),
    (b"foo", b"bar3"),
];

#[test]
fn hash_matches_reference() {
    let keys: [&[u8]; 5] = [b"", b"a", b"foo", b"This is a test", &[0xff; 64]];
    for key in keys {
        assert_eq!(constdb::hash(key), djb(key));
    }
}

#[test]
fn reader_accepts_classic_layout() {
    let db = cdbmake(PAIRS);
    let mut reader = Reader::new(Cursor::new(db)).unwrap();
    assert_eq!(reader.mode(), constdb::Mode::Bits32);

    assert_eq!(
        reader.values(b"foo").unwrap(),
        vec![b"bar".to_vec(), b"bar3".to_vec()]
    );
    assert_eq!(reader.get(b"Blahrg").unwrap(), Some(b"What is this?".to_vec()));
    assert!(reader.values(b"absent").unwrap().is_empty());

    let scanned: Vec<_> = reader.iter().map(Result::unwrap).collect();
    let expected: Vec<_> = PAIRS.iter().map(|(k, v)| (k.to_vec(), v.to_vec())).collect();
    assert_eq!(scanned, expected);
}

#[test]
fn classic_lookup_reads_writer_output() {
    for fill in [0.5, 0.7, 1.0] {
        let mut buf = Cursor::new(Vec::new());
        let config = WriterConfig {
            hash_fill_factor: fill,
            ..Default::default()
        };
        let mut writer = Writer::new(&mut buf, config).unwrap();
        for (k, v) in PAIRS {
            writer.store(k, v).unwrap();
        }
        writer.close().unwrap();
        drop(writer);
        let db = buf.into_inner();

        assert_eq!(cdbget(&db, b"foo"), vec![b"bar".to_vec(), b"bar3".to_vec()]);
        assert_eq!(cdbget(&db, b"Some more"), vec![b"5678".to_vec()]);
        assert!(cdbget(&db, b"absent").is_empty());
    }
}

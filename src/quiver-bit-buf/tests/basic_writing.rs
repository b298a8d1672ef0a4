use quiver_bit_buf::{BitReader, BitWriter, Error};

#[test]
fn write_primitives() -> Result<(), Error> {
    let mut buf = [0; 8];

    let mut writer = BitWriter::new(&mut buf);
    writer.write_unsigned_bits(0xFF, 8)?;
    writer.write_unsigned_bits(0xDEAD, 16)?;
    writer.write_unsigned_bits(0xFF, 8)?;

    assert_eq!(writer.bits_written(), 32);
    assert_eq!(writer.as_bytes(), &[0xFF, 0xAD, 0xDE, 0xFF]);

    Ok(())
}

#[test]
fn write_straddles_word_boundaries() -> Result<(), Error> {
    let mut buf = [0; 8];

    let mut writer = BitWriter::new(&mut buf);
    writer.write_unsigned_bits(0xF, 4)?;
    writer.write_unsigned_bits(0xAABB_CCDD, 32)?;

    assert_eq!(writer.bits_written(), 36);
    assert_eq!(writer.as_bytes(), &[0xDF, 0xCD, 0xBC, 0xAB, 0x0A]);

    Ok(())
}

#[test]
fn unsigned_round_trip_all_widths() -> Result<(), Error> {
    for nbits in 0..=32u32 {
        for value in [0u32, 1, 0x5555_5555, 0xAAAA_AAAA, u32::MAX] {
            let expected = if nbits == 32 {
                value
            } else {
                value & ((1 << nbits) - 1)
            };

            let mut buf = [0; 12];
            let mut writer = BitWriter::new(&mut buf);
            // An odd prefix forces the unaligned paths as well.
            writer.write_unsigned_bits(0b101, 3)?;
            writer.write_unsigned_bits(value, nbits)?;
            drop(writer);

            let mut reader = BitReader::new(&buf);
            assert_eq!(reader.read_unsigned_bits(3), 0b101);
            assert_eq!(
                reader.read_unsigned_bits(nbits),
                expected,
                "width {nbits}, value {value:#x}"
            );
        }
    }

    Ok(())
}

#[test]
fn signed_round_trip_all_widths() -> Result<(), Error> {
    for nbits in 1..=32u32 {
        let min = if nbits == 32 {
            i32::MIN
        } else {
            -(1 << (nbits - 1))
        };
        let max = if nbits == 32 {
            i32::MAX
        } else {
            (1 << (nbits - 1)) - 1
        };

        for value in [min, max, 0, min / 2, max / 2] {
            let mut buf = [0; 8];
            let mut writer = BitWriter::new(&mut buf);
            writer.write_signed_bits(value, nbits)?;
            drop(writer);

            let mut reader = BitReader::new(&buf);
            assert_eq!(
                reader.read_signed_bits(nbits),
                value,
                "width {nbits}, value {value}"
            );
        }
    }

    Ok(())
}

#[test]
fn mixed_field_sequence_round_trips() -> Result<(), Error> {
    let mut buf = [0; 8];

    let mut writer = BitWriter::new(&mut buf);
    writer.write_one_bit(true)?;
    writer.write_signed_bits(-5, 6)?;
    writer.write_unsigned_bits(0x1F, 5)?;
    assert_eq!(writer.bits_written(), 12);
    drop(writer);

    let mut reader = BitReader::new(&buf);
    assert!(reader.read_one_bit());
    assert_eq!(reader.read_signed_bits(6), -5);
    assert_eq!(reader.read_unsigned_bits(5), 0x1F);
    assert_eq!(reader.bits_read(), 12);

    Ok(())
}

#[test]
fn bulk_path_matches_bit_by_bit() -> Result<(), Error> {
    let src: Vec<u8> = (0u32..64).map(|i| (i * 37 + 11) as u8).collect();

    for prefix in [0u32, 1, 3, 7, 8, 13, 31] {
        for nbits in [1usize, 5, 8, 9, 24, 31, 32, 33, 64, 100, 311] {
            let mut bulk = [0; 64];
            let mut naive = [0; 64];

            let mut writer = BitWriter::new(&mut bulk);
            writer.write_unsigned_bits(0x2AAA_AAAA, prefix)?;
            writer.write_bits(&src, nbits)?;
            drop(writer);

            let mut writer = BitWriter::new(&mut naive);
            writer.write_unsigned_bits(0x2AAA_AAAA, prefix)?;
            for bit in 0..nbits {
                writer.write_one_bit(src[bit >> 3] & (1 << (bit & 7)) != 0)?;
            }
            drop(writer);

            assert_eq!(bulk, naive, "prefix {prefix}, nbits {nbits}");
        }
    }

    Ok(())
}

#[test]
fn byte_writes_equal_bulk_writes() -> Result<(), Error> {
    let payload = *b"quiver";

    let mut via_bytes = [0; 8];
    let mut writer = BitWriter::new(&mut via_bytes);
    writer.write_bytes(&payload)?;
    drop(writer);

    let mut via_ints = [0; 8];
    let mut writer = BitWriter::new(&mut via_ints);
    for &byte in &payload {
        writer.write_u8(byte)?;
    }
    drop(writer);

    assert_eq!(via_bytes, via_ints);

    Ok(())
}

#[test]
fn string_writes_are_nul_terminated() -> Result<(), Error> {
    let mut buf = [0xFF; 8];

    let mut writer = BitWriter::new(&mut buf);
    writer.write_str("abc")?;
    assert_eq!(writer.bits_written(), 32);
    assert_eq!(writer.as_bytes(), b"abc\0");
    drop(writer);

    // An empty string is just the terminator.
    let mut writer = BitWriter::new(&mut buf);
    writer.write_str("")?;
    assert_eq!(writer.bits_written(), 8);
    assert_eq!(writer.as_bytes(), b"\0");

    Ok(())
}

#[test]
fn integer_conveniences_round_trip() -> Result<(), Error> {
    let mut buf = [0; 32];

    let mut writer = BitWriter::new(&mut buf);
    writer.write_u8(0xA5)?;
    writer.write_i8(-100)?;
    writer.write_u16(54321)?;
    writer.write_i16(-12345)?;
    writer.write_u32(0xDEAD_BEEF)?;
    writer.write_i32(i32::MIN)?;
    writer.write_i64(-(1i64 << 40))?;
    writer.write_f32(123.456)?;
    drop(writer);

    let mut reader = BitReader::new(&buf);
    assert_eq!(reader.read_u8(), 0xA5);
    assert_eq!(reader.read_i8(), -100);
    assert_eq!(reader.read_u16(), 54321);
    assert_eq!(reader.read_i16(), -12345);
    assert_eq!(reader.read_u32(), 0xDEAD_BEEF);
    assert_eq!(reader.read_i32(), i32::MIN);
    assert_eq!(reader.read_i64(), -(1i64 << 40));
    assert_eq!(reader.read_f32(), 123.456);
    assert!(!reader.is_overflowed());

    Ok(())
}

#[test]
fn zero_width_writes_are_no_ops() -> Result<(), Error> {
    let mut buf = [0; 4];

    // A zero-width write with the cursor parked at a word-aligned
    // capacity must neither overflow nor touch memory past the buffer.
    let mut writer = BitWriter::new(&mut buf);
    writer.write_unsigned_bits(0xDEAD_BEEF, 32)?;
    writer.write_unsigned_bits(0, 0)?;
    assert_eq!(writer.bits_written(), 32);
    assert!(!writer.is_overflowed());

    let mut reader = BitReader::new(&buf);
    let mut sink = [0; 4];
    let mut writer = BitWriter::new(&mut sink);
    writer.write_unsigned_bits(0xDEAD_BEEF, 32)?;
    writer.write_bits_from_reader(&mut reader, 0)?;
    assert_eq!(writer.bits_written(), 32);

    Ok(())
}

#[test]
fn overflow_is_contained_and_sticky() {
    let mut buf = [0xEE; 12];

    {
        let (data, guard) = buf.split_at_mut(8);
        let mut writer = BitWriter::with_capacity_bits(data, 60);

        assert!(writer.write_unsigned_bits(u32::MAX, 32).is_ok());
        assert!(writer.write_unsigned_bits(u32::MAX, 26).is_ok());

        // 58 + 4 > 60: refused as a whole, flag goes sticky.
        assert!(matches!(
            writer.write_unsigned_bits(0xF, 4),
            Err(Error::Overflow)
        ));
        assert!(writer.is_overflowed());

        // Even a fitting write is a no-op until reset.
        assert!(writer.write_one_bit(true).is_err());

        writer.reset();
        assert!(!writer.is_overflowed());
        assert!(writer.write_one_bit(true).is_ok());

        assert_eq!(guard, [0xEE; 4]);
    }

    // Nothing beyond the bound region was touched.
    assert_eq!(&buf[8..], &[0xEE; 4]);
}

#[test]
fn bulk_overflow_commits_nothing() {
    let mut buf = [0; 4];

    let mut writer = BitWriter::new(&mut buf);
    assert!(writer.write_bits(&[0xFF; 8], 33).is_err());
    assert!(writer.is_overflowed());
    drop(writer);

    assert_eq!(buf, [0; 4]);
}

#[test]
fn seek_supports_backpatching() -> Result<(), Error> {
    let mut buf = [0; 8];

    let mut writer = BitWriter::new(&mut buf);
    writer.write_unsigned_bits(0, 8)?;
    writer.write_unsigned_bits(0xAB, 8)?;

    let end = writer.bits_written();
    writer.seek_to(0);
    writer.write_unsigned_bits(0x42, 8)?;
    writer.seek_to(end);

    assert_eq!(writer.as_bytes(), &[0x42, 0xAB]);

    Ok(())
}

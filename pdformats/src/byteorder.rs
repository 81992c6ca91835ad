//! Little-endian byte serialization for the fixed-layout headers this crate
//! emits (ELF section/program headers, WAV `fmt `/`data` chunks).

pub trait WriteBytesLe {
    fn write_le(&self, dst: &mut Vec<u8>);
}

macro_rules! impl_num_le {
    ($($t:ty),+) => { $(
        impl WriteBytesLe for $t {
            #[inline]
            fn write_le(&self, dst: &mut Vec<u8>) {
                dst.extend_from_slice(&self.to_le_bytes());
            }
        }
    )+ }
}

impl_num_le!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl<T: WriteBytesLe> WriteBytesLe for Vec<T> {
    #[inline]
    fn write_le(&self, dst: &mut Vec<u8>) {
        self.iter().for_each(|item| item.write_le(dst));
    }
}

impl<T: WriteBytesLe, const N: usize> WriteBytesLe for [T; N] {
    #[inline]
    fn write_le(&self, dst: &mut Vec<u8>) {
        self.iter().for_each(|item| item.write_le(dst));
    }
}

#[macro_export]
macro_rules! join_bytes_le {
    ( $($value:expr),+ $(,)? ) => {{
        let mut vec = Vec::<u8>::new();
        $( $crate::byteorder::WriteBytesLe::write_le(&$value, &mut vec); )+
        vec
    }};
}

#[allow(unused_imports)]
pub use join_bytes_le;

#[cfg(test)]
mod tests {
    use super::*;
    use pdtool_macros::ToBytes;

    #[derive(ToBytes)]
    struct Mini {
        a: u16,
        b: u32,
        tag: [u8; 4],
    }

    #[test]
    fn to_bytes_roundtrip() {
        let s = Mini {
            a: 0x1234,
            b: 0xABCDEF01,
            tag: *b"TEST",
        };

        let mut buf = Vec::new();
        s.write_le(&mut buf);

        let expected = [0x34, 0x12, 0x01, 0xEF, 0xCD, 0xAB, b'T', b'E', b'S', b'T'];
        assert_eq!(&buf[..], &expected);
    }
}

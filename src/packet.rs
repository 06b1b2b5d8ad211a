use anyhow::bail;
use bytes::{Buf, BufMut, BytesMut};
use crate::seq_nr::SeqNr;

/// The two header bytes in front of every datagram's payload
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PacketHeader {
    /// the sender's own sequence number, incremented for every packet it sends
    pub own_seq: SeqNr,
    /// the most recent sequence number the sender saw from its peer, echoed back
    pub feedback_seq: SeqNr,
}
impl PacketHeader {
    pub const SERIALIZED_LEN: usize = 2;

    pub fn ser(&self, buf: &mut BytesMut) {
        buf.put_u8(self.own_seq.to_raw());
        buf.put_u8(self.feedback_seq.to_raw());
    }

    pub fn deser(buf: &mut impl Buf) -> anyhow::Result<PacketHeader> {
        if buf.remaining() < Self::SERIALIZED_LEN {
            bail!("packet header requires {} bytes, got {}", Self::SERIALIZED_LEN, buf.remaining());
        }

        let own_seq = SeqNr::from_raw(buf.get_u8());
        let feedback_seq = SeqNr::from_raw(buf.get_u8());
        Ok(PacketHeader {
            own_seq,
            feedback_seq,
        })
    }
}

/// A parsed datagram, borrowing its payload from the receive buffer
#[derive(Debug)]
pub struct Packet<'a> {
    pub header: PacketHeader,
    pub payload: &'a [u8],
}
impl<'a> Packet<'a> {
    pub fn datagram_len(payload_size: usize) -> usize {
        PacketHeader::SERIALIZED_LEN + payload_size
    }

    /// Datagrams shorter than header plus `payload_size` are rejected. Trailing bytes after
    ///  the configured payload size are ignored.
    pub fn parse(datagram: &'a [u8], payload_size: usize) -> anyhow::Result<Packet<'a>> {
        if datagram.len() < Self::datagram_len(payload_size) {
            bail!("undersized datagram: expected at least {} bytes, got {}", Self::datagram_len(payload_size), datagram.len());
        }

        let mut parse_buf = datagram;
        let header = PacketHeader::deser(&mut parse_buf)?;
        Ok(Packet {
            header,
            payload: &parse_buf[..payload_size],
        })
    }

    pub fn build(header: &PacketHeader, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::with_capacity(Self::datagram_len(payload.len()));
        header.ser(&mut buf);
        buf.put_slice(payload);
        buf
    }
}

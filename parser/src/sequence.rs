//! Reading of item-delimited content.
//!
//! A sequence of defined length is read item by item until its length
//! is consumed.
//! A sequence of undefined length is read until the sequence delimiter,
//! and the cursor is left right after the delimiter's zero length.
//! Items follow the same two rules with the item delimiter.
//!
//! Encapsulated pixel data is a list of fragments, each an item of
//! defined length, terminated by a sequence delimiter
//! or by the end of the buffer.
use crate::reader::{
    ElementReader, ExcessiveNestingSnafu, LengthOverrunSnafu, ReadHeaderSnafu, ReadValueSnafu,
    Result, UndefinedFragmentLengthSnafu, UnexpectedTagSnafu,
};
use dicomkit_core::header::{Header, SequenceItemHeader};
use dicomkit_core::{DataDictionary, Fragment, Item, Offsets, Parent, Tag};
use dicomkit_encoding::decode::{decode_item_header, decode_length, ITEM_HEADER_SIZE};
use dicomkit_encoding::tag::{decode_tag_at, take};
use dicomkit_encoding::{Encoding, Endianness};
use snafu::{ensure, ResultExt};

impl<'a, D> ElementReader<'a, D>
where
    D: DataDictionary,
{
    /// Read the items of the sequence `tag`, whose value starts at `position`.
    /// `len` is `None` if the sequence has undefined length.
    ///
    /// Returns the items and the position right after the sequence.
    pub(crate) fn read_sequence(
        &self,
        tag: Tag,
        position: usize,
        len: Option<u32>,
        encoding: Encoding,
        depth: usize,
    ) -> Result<(Vec<Item>, usize)> {
        ensure!(
            depth <= self.max_depth,
            ExcessiveNestingSnafu {
                max_depth: self.max_depth,
                position,
            }
        );
        let order = encoding.endianness;
        let mut items = Vec::new();
        let mut pos = position;

        match len {
            Some(len) => {
                let end = position + len as usize;
                while pos < end {
                    let (item, next) = self.read_item(tag, items.len(), pos, encoding, depth)?;
                    items.push(item);
                    pos = next;
                }
                ensure!(pos == end, LengthOverrunSnafu { tag, end, position: pos });
                Ok((items, pos))
            }
            None => loop {
                let header = decode_item_header(self.buf, pos, order)
                    .context(ReadHeaderSnafu { position: pos })?;
                match header {
                    SequenceItemHeader::SequenceDelimiter => {
                        return Ok((items, pos + ITEM_HEADER_SIZE));
                    }
                    SequenceItemHeader::Item { .. } => {
                        let (item, next) = self.read_item(tag, items.len(), pos, encoding, depth)?;
                        items.push(item);
                        pos = next;
                    }
                    SequenceItemHeader::ItemDelimiter => {
                        return UnexpectedTagSnafu {
                            tag: Tag::ITEM_DELIMITER,
                            position: pos,
                        }
                        .fail();
                    }
                }
            },
        }
    }

    /// Read the item of sequence `sequence` starting at `position`.
    fn read_item(
        &self,
        sequence: Tag,
        index: usize,
        position: usize,
        encoding: Encoding,
        depth: usize,
    ) -> Result<(Item, usize)> {
        let order = encoding.endianness;
        let len = match decode_item_header(self.buf, position, order)
            .context(ReadHeaderSnafu { position })?
        {
            SequenceItemHeader::Item { len } => len,
            other => {
                return UnexpectedTagSnafu {
                    tag: other.tag(),
                    position,
                }
                .fail()
            }
        };

        let parent = Parent {
            sequence,
            item: index,
        };
        let data = position + ITEM_HEADER_SIZE;
        let mut elements = Vec::new();
        let mut pos = data;

        let end = match len.get() {
            Some(len) => {
                let item_end = data + len as usize;
                while pos < item_end {
                    let (element, next) = self.read_element_in(pos, encoding, depth)?;
                    elements.push(element.with_parent(parent));
                    pos = next;
                }
                ensure!(
                    pos == item_end,
                    LengthOverrunSnafu {
                        tag: sequence,
                        end: item_end,
                        position: pos,
                    }
                );
                pos
            }
            None => loop {
                let tag = decode_tag_at(self.buf, pos, order)
                    .context(ReadValueSnafu { tag: sequence })?;
                if tag == Tag::ITEM_DELIMITER {
                    decode_item_header(self.buf, pos, order)
                        .context(ReadHeaderSnafu { position: pos })?;
                    break pos + ITEM_HEADER_SIZE;
                }
                ensure!(
                    tag.group() != 0xFFFE,
                    UnexpectedTagSnafu { tag, position: pos }
                );
                let (element, next) = self.read_element_in(pos, encoding, depth)?;
                elements.push(element.with_parent(parent));
                pos = next;
            },
        };

        let item = Item::decoded(
            len,
            Offsets {
                start: position,
                data,
                end,
            },
            elements,
            sequence,
        );
        Ok((item, end))
    }

    /// Read the fragments of encapsulated pixel data starting at `position`.
    ///
    /// Returns the fragments and the position after the sequence delimiter,
    /// or the end of the buffer if there was none.
    pub(crate) fn read_fragments(
        &self,
        position: usize,
        order: Endianness,
    ) -> Result<(Vec<Fragment>, usize)> {
        let mut fragments = Vec::new();
        let mut pos = position;

        while pos < self.buf.len() {
            let tag = decode_tag_at(self.buf, pos, order)
                .context(ReadValueSnafu { tag: Tag::PIXEL_DATA })?;
            if tag == Tag::SEQUENCE_DELIMITER {
                // the delimiter length may be cut off at the end of a file
                let end = (pos + ITEM_HEADER_SIZE).min(self.buf.len());
                return Ok((fragments, end));
            }
            ensure!(
                tag == Tag::ITEM,
                UnexpectedTagSnafu { tag, position: pos }
            );
            let len =
                decode_length(self.buf, pos + 4, order).context(ReadHeaderSnafu { position: pos })?;
            let len = match len.get() {
                Some(len) => len as usize,
                None => return UndefinedFragmentLengthSnafu { position: pos }.fail(),
            };
            let data = pos + ITEM_HEADER_SIZE;
            let bytes = take(self.buf, data, len).context(ReadValueSnafu { tag: Tag::PIXEL_DATA })?;
            let fragment = Fragment::decoded(
                Offsets {
                    start: pos,
                    data,
                    end: data + len,
                },
                bytes.to_vec(),
            );
            fragments.push(fragment);
            pos = data + len;
        }

        Ok((fragments, pos))
    }
}

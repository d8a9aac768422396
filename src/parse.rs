//! Transcription parser: annotated IPA text to an [`Utterance`] tree.
//!
//! Input grammar: whitespace-separated word tokens; paragraphs split on
//! blank-line runs. A word is optional leading region markers (`"`, `*`)
//! and a stress marker `'`, a body of phonetic symbols each followed by a
//! run of `>`, `<`, `+`, `-` modifiers, an optional trailing `,`, then
//! optional trailing region markers and a terminal marker (`.`, `?`, `!`,
//! `!?`/`?!`). Unknown symbols fail fast with their position.

use tracing::debug;

use crate::error::ParseError;
use crate::ipa::SymbolTable;
use crate::utterance::{Paragraph, PhoneToken, Sentence, SentenceType, Utterance, Word};

/// Parses UTF-8 transcription text against a symbol table.
///
/// Sentences lacking a terminal marker at paragraph end default to
/// statements.
///
/// # Errors
///
/// [`ParseError`] for unknown symbols, unbalanced quotation or emphasis
/// regions, stray markers, or empty words, each naming its position.
pub fn parse(text: &str, table: &SymbolTable) -> Result<Utterance, ParseError> {
    let mut utterance = Utterance::default();
    for block in split_paragraphs(text) {
        let index = utterance.paragraphs.len() + 1;
        let paragraph = parse_paragraph(&block, index, table)?;
        if !paragraph.sentences.is_empty() {
            utterance.paragraphs.push(paragraph);
        }
    }
    let shape = utterance.shape();
    debug!(
        paragraphs = shape.paragraphs,
        sentences = shape.sentences,
        words = shape.words,
        phones = shape.phones,
        "parsed transcription"
    );
    Ok(utterance)
}

/// Groups lines into paragraphs separated by one or more blank lines.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(line.trim());
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn parse_paragraph(
    block: &str,
    paragraph: usize,
    table: &SymbolTable,
) -> Result<Paragraph, ParseError> {
    let mut sentences: Vec<Sentence> = Vec::new();
    let mut words: Vec<Word> = Vec::new();
    let mut quoted = false;
    let mut emphasized = false;

    for raw in block.split_whitespace() {
        let sentence = sentences.len() + 1;
        let token = split_word(raw, paragraph, sentence, words.len() + 1)?;

        // Leading markers open regions; reopening an open region means the
        // previous one was never closed.
        if token.opens_quote {
            if quoted {
                return Err(ParseError::UnbalancedQuotation {
                    paragraph,
                    sentence,
                });
            }
            quoted = true;
        }
        if token.opens_emphasis {
            if emphasized {
                return Err(ParseError::UnbalancedEmphasis {
                    paragraph,
                    sentence,
                });
            }
            emphasized = true;
        }

        let phones = parse_body(&token, paragraph, sentence, words.len() + 1, table)?;
        words.push(Word {
            phones,
            stressed: token.stressed,
            quoted,
            emphasized,
            pause_after: token.pause_after,
        });

        if token.closes_quote {
            if !quoted {
                return Err(ParseError::UnbalancedQuotation {
                    paragraph,
                    sentence,
                });
            }
            quoted = false;
        }
        if token.closes_emphasis {
            if !emphasized {
                return Err(ParseError::UnbalancedEmphasis {
                    paragraph,
                    sentence,
                });
            }
            emphasized = false;
        }

        if let Some(kind) = token.terminal {
            if quoted {
                return Err(ParseError::UnbalancedQuotation {
                    paragraph,
                    sentence,
                });
            }
            if emphasized {
                return Err(ParseError::UnbalancedEmphasis {
                    paragraph,
                    sentence,
                });
            }
            sentences.push(Sentence {
                words: std::mem::take(&mut words),
                kind,
            });
        }
    }

    // Trailing words without a terminal marker form a statement.
    if !words.is_empty() {
        let sentence = sentences.len() + 1;
        if quoted {
            return Err(ParseError::UnbalancedQuotation {
                paragraph,
                sentence,
            });
        }
        if emphasized {
            return Err(ParseError::UnbalancedEmphasis {
                paragraph,
                sentence,
            });
        }
        sentences.push(Sentence {
            words,
            kind: SentenceType::Statement,
        });
    }

    Ok(Paragraph { sentences })
}

/// A word token split into markup and phone body, before symbol resolution.
struct WordToken {
    body: Vec<char>,
    stressed: bool,
    pause_after: bool,
    opens_quote: bool,
    opens_emphasis: bool,
    closes_quote: bool,
    closes_emphasis: bool,
    terminal: Option<SentenceType>,
    raw: String,
}

fn split_word(
    raw: &str,
    paragraph: usize,
    sentence: usize,
    word: usize,
) -> Result<WordToken, ParseError> {
    let chars: Vec<char> = raw.chars().collect();
    let mut start = 0;
    let mut opens_quote = false;
    let mut opens_emphasis = false;
    while start < chars.len() && (chars[start] == '"' || chars[start] == '*') {
        if chars[start] == '"' {
            opens_quote = true;
        } else {
            opens_emphasis = true;
        }
        start += 1;
    }
    let stressed = start < chars.len() && chars[start] == '\'';
    if stressed {
        start += 1;
    }

    let mut end = chars.len();
    let terminal = match &chars[start.max(end.saturating_sub(2))..end] {
        ['!', '?'] | ['?', '!'] => {
            end -= 2;
            Some(SentenceType::QuestionExclamation)
        }
        _ => match chars[start..end].last() {
            Some('.') => {
                end -= 1;
                Some(SentenceType::Statement)
            }
            Some('?') => {
                end -= 1;
                Some(SentenceType::Question)
            }
            Some('!') => {
                end -= 1;
                Some(SentenceType::Exclamation)
            }
            _ => None,
        },
    };
    // Closing markers and a pause comma may appear in either order.
    let mut closes_quote = false;
    let mut closes_emphasis = false;
    let mut pause_after = false;
    while end > start {
        match chars[end - 1] {
            '"' => closes_quote = true,
            '*' => closes_emphasis = true,
            ',' if !pause_after => pause_after = true,
            _ => break,
        }
        end -= 1;
    }

    if end <= start {
        return Err(ParseError::EmptyWord {
            paragraph,
            sentence,
            word,
        });
    }

    Ok(WordToken {
        body: chars[start..end].to_vec(),
        stressed,
        pause_after,
        opens_quote,
        opens_emphasis,
        closes_quote,
        closes_emphasis,
        terminal,
        raw: raw.to_owned(),
    })
}

fn parse_body(
    token: &WordToken,
    paragraph: usize,
    sentence: usize,
    word: usize,
    table: &SymbolTable,
) -> Result<Vec<PhoneToken>, ParseError> {
    let body = &token.body;
    let mut phones = Vec::new();
    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        if matches!(c, ',' | '\'' | '"' | '*' | '.' | '?' | '!') {
            return Err(ParseError::StrayMarker {
                marker: c,
                word: token.raw.clone(),
                paragraph,
                sentence,
            });
        }
        let Some((len, symbol, target)) = table.longest_match(&body[i..]) else {
            return Err(ParseError::UnknownSymbol {
                symbol: c.to_string(),
                paragraph,
                sentence,
                word,
            });
        };
        i += len;

        // Each modifier character is counted independently.
        let mut lengthen = 0;
        let mut shorten = 0;
        let mut raise = 0;
        let mut lower = 0;
        while i < body.len() {
            match body[i] {
                '>' => lengthen += 1,
                '<' => shorten += 1,
                '+' => raise += 1,
                '-' => lower += 1,
                _ => break,
            }
            i += 1;
        }
        phones.push(PhoneToken::new(
            symbol,
            target.clone(),
            lengthen,
            shorten,
            raise,
            lower,
        ));
    }

    if phones.is_empty() {
        return Err(ParseError::EmptyWord {
            paragraph,
            sentence,
            word,
        });
    }
    Ok(phones)
}

//! Minimal nom parsers for the URI and name-addr text forms
//!
//! Full header parsing lives upstream; these parsers only cover what is
//! needed to build route hops and party headers from configuration or tests.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag_no_case, take_till1, take_while, take_while1},
    character::complete::{char, digit1, space0},
    combinator::{all_consuming, map, map_res, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
};

use crate::errors::{DialogError, DialogResult};
use super::header::NameAddr;
use super::uri::{Param, Scheme, SipUri};

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-.!%*_+`'~".contains(c)
}

fn is_param_value_char(c: char) -> bool {
    !matches!(c, ';' | '?' | '>' | ',' | '&' | ' ' | '\t')
}

fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')
}

fn scheme(input: &str) -> IResult<&str, Scheme> {
    alt((
        map(tag_no_case("sips:"), |_| Scheme::Sips),
        map(tag_no_case("sip:"), |_| Scheme::Sip),
        map(tag_no_case("tel:"), |_| Scheme::Tel),
    ))(input)
}

fn user(input: &str) -> IResult<&str, &str> {
    terminated(take_till1(|c| matches!(c, '@' | ';' | '?' | '>' | ' ')), char('@'))(input)
}

fn host(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(delimited(char('['), take_till1(|c| c == ']'), char(']'))),
        take_while1(is_host_char),
    ))(input)
}

fn port(input: &str) -> IResult<&str, u16> {
    preceded(char(':'), map_res(digit1, str::parse::<u16>))(input)
}

fn param(input: &str) -> IResult<&str, Param> {
    map(
        pair(
            take_while1(is_token_char),
            opt(preceded(char('='), take_while1(is_param_value_char))),
        ),
        |(name, value): (&str, Option<&str>)| Param::new(name, value),
    )(input)
}

fn params(input: &str) -> IResult<&str, Vec<Param>> {
    many0(preceded(char(';'), param))(input)
}

fn uri_headers(input: &str) -> IResult<&str, Vec<(String, String)>> {
    map(
        preceded(
            char('?'),
            separated_list1(
                char('&'),
                separated_pair(
                    take_while1(is_token_char),
                    char('='),
                    take_while(|c| !matches!(c, '&' | '>' | ' ')),
                ),
            ),
        ),
        |pairs: Vec<(&str, &str)>| {
            pairs
                .into_iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect()
        },
    )(input)
}

pub(crate) fn uri(input: &str) -> IResult<&str, SipUri> {
    map(
        tuple((scheme, opt(user), host, opt(port), params, opt(uri_headers))),
        |(scheme, user, host, port, params, headers)| SipUri {
            scheme,
            user: user.map(str::to_string),
            host: host.to_string(),
            port,
            params,
            headers: headers.unwrap_or_default(),
        },
    )(input)
}

fn quoted_display(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c| c != '"'), char('"'))(input)
}

fn token_display(input: &str) -> IResult<&str, &str> {
    take_till1(|c| c == '<' || c == '"')(input)
}

fn name_addr(input: &str) -> IResult<&str, NameAddr> {
    map(
        tuple((
            opt(terminated(alt((quoted_display, token_display)), space0)),
            delimited(char('<'), uri, char('>')),
            params,
        )),
        |(display, uri, params)| {
            let display_name = display
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string);
            NameAddr {
                display_name,
                uri,
                params,
            }
        },
    )(input)
}

fn bare_addr(input: &str) -> IResult<&str, NameAddr> {
    map(uri, NameAddr::new)(input)
}

pub(crate) fn parse_uri(input: &str) -> DialogResult<SipUri> {
    all_consuming(uri)(input)
        .map(|(_, uri)| uri)
        .map_err(|e| DialogError::protocol_error(&format!("invalid SIP URI '{}': {}", input, e)))
}

/// Parse `"Display" <uri>;params`, `<uri>;params` or a bare URI.
///
/// A bare URI keeps its `;params` as URI parameters.
pub(crate) fn parse_name_addr(input: &str) -> DialogResult<NameAddr> {
    all_consuming(alt((name_addr, bare_addr)))(input)
        .map(|(_, addr)| addr)
        .map_err(|e| DialogError::protocol_error(&format!("invalid name-addr '{}': {}", input, e)))
}

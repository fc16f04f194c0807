use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_until, take_while1},
    character::complete::{alpha1, char, digit1, multispace0, multispace1},
    combinator::{map, map_opt, map_res, opt, recognize, value},
    multi::separated_list1,
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::model::{ShipDraft, ShipPatch, ShipType};
use crate::query::{ShipCriteria, ShipOrder};

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    List {
        criteria: ShipCriteria,
        order: ShipOrder,
        page_number: Option<usize>,
        page_size: Option<usize>,
    },
    Count { criteria: ShipCriteria },
    // Ids stay raw so the server is the one judging them.
    Get { id: String },
    Create { draft: ShipDraft },
    Update { id: String, patch: ShipPatch },
    Delete { id: String },
    Compact,
    Help,
    Exit,
}

#[derive(Debug, PartialEq, Clone)]
enum Condition {
    NameContains(String),
    PlanetContains(String),
    Type(ShipType),
    After(i64),
    Before(i64),
    Used(bool),
    MinSpeed(f64),
    MaxSpeed(f64),
    MinCrew(i32),
    MaxCrew(i32),
    MinRating(f64),
    MaxRating(f64),
}

impl Condition {
    fn apply(self, c: &mut ShipCriteria) {
        match self {
            Condition::NameContains(s) => c.name = Some(s),
            Condition::PlanetContains(s) => c.planet = Some(s),
            Condition::Type(t) => c.ship_type = Some(t),
            Condition::After(t) => c.after = Some(t),
            Condition::Before(t) => c.before = Some(t),
            Condition::Used(u) => c.is_used = Some(u),
            Condition::MinSpeed(v) => c.min_speed = Some(v),
            Condition::MaxSpeed(v) => c.max_speed = Some(v),
            Condition::MinCrew(n) => c.min_crew_size = Some(n),
            Condition::MaxCrew(n) => c.max_crew_size = Some(n),
            Condition::MinRating(v) => c.min_rating = Some(v),
            Condition::MaxRating(v) => c.max_rating = Some(v),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
enum Assignment {
    Name(String),
    Planet(String),
    Type(ShipType),
    Date(i64),
    Used(bool),
    Speed(f64),
    Crew(i32),
}

impl Assignment {
    fn apply(self, p: &mut ShipPatch) {
        match self {
            Assignment::Name(s) => p.name = Some(s),
            Assignment::Planet(s) => p.planet = Some(s),
            Assignment::Type(t) => p.ship_type = Some(t),
            Assignment::Date(d) => p.prod_date = Some(d),
            Assignment::Used(u) => p.is_used = Some(u),
            Assignment::Speed(v) => p.speed = Some(v),
            Assignment::Crew(n) => p.crew_size = Some(n),
        }
    }
}

// --- BASIC PARSERS ---

fn parse_float(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, opt(tuple((char('.'), digit1)))))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

fn parse_i64(input: &str) -> IResult<&str, i64> {
    map_res(recognize(tuple((opt(char('-')), digit1))), |s: &str| s.parse::<i64>())(input)
}

fn parse_i32(input: &str) -> IResult<&str, i32> {
    map_res(recognize(tuple((opt(char('-')), digit1))), |s: &str| s.parse::<i32>())(input)
}

fn parse_usize(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

fn parse_bool(input: &str) -> IResult<&str, bool> {
    alt((value(true, tag_ci("TRUE")), value(false, tag_ci("FALSE"))))(input)
}

fn parse_ship_type(input: &str) -> IResult<&str, ShipType> {
    map_opt(alpha1, ShipType::parse)(input)
}

fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"')(input)?;
    let (input, content) = take_until("\"")(input)?;
    let (input, _) = char('"')(input)?;
    Ok((input, content.to_string()))
}

fn parse_raw_id(input: &str) -> IResult<&str, String> {
    let (input, _) = opt(char('\''))(input)?;
    let (input, id) = take_while1(|c: char| !c.is_whitespace() && c != '\'')(input)?;
    let (input, _) = opt(char('\''))(input)?;
    Ok((input, id.to_string()))
}

// --- HELPERS ---
fn ws<'a, F, O, E: nom::error::ParseError<&'a str>>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where F: FnMut(&'a str) -> IResult<&'a str, O, E> {
    delimited(multispace0, inner, multispace0)
}

fn tag_ci(t: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| tag_no_case(t)(input)
}

fn ge(input: &str) -> IResult<&str, &str> {
    ws(tag(">="))(input)
}

fn le(input: &str) -> IResult<&str, &str> {
    ws(tag("<="))(input)
}

fn eq(input: &str) -> IResult<&str, char> {
    ws(char('='))(input)
}

fn type_field(input: &str) -> IResult<&str, &str> {
    alt((tag_ci("SHIPTYPE"), tag_ci("TYPE")))(input)
}

// --- CLAUSE PARSERS ---

fn parse_condition(input: &str) -> IResult<&str, Condition> {
    alt((
        map(preceded(tuple((tag_ci("NAME"), ws(tag_ci("CONTAINS")))), parse_quoted_string), Condition::NameContains),
        map(preceded(tuple((tag_ci("PLANET"), ws(tag_ci("CONTAINS")))), parse_quoted_string), Condition::PlanetContains),
        map(preceded(tuple((type_field, eq)), parse_ship_type), Condition::Type),
        map(preceded(tuple((tag_ci("DATE"), ws(char('>')))), parse_i64), Condition::After),
        map(preceded(tuple((tag_ci("DATE"), ws(char('<')))), parse_i64), Condition::Before),
        map(preceded(tuple((tag_ci("USED"), eq)), parse_bool), Condition::Used),
        map(preceded(tuple((tag_ci("SPEED"), ge)), parse_float), Condition::MinSpeed),
        map(preceded(tuple((tag_ci("SPEED"), le)), parse_float), Condition::MaxSpeed),
        map(preceded(tuple((tag_ci("CREW"), ge)), parse_i32), Condition::MinCrew),
        map(preceded(tuple((tag_ci("CREW"), le)), parse_i32), Condition::MaxCrew),
        map(preceded(tuple((tag_ci("RATING"), ge)), parse_float), Condition::MinRating),
        map(preceded(tuple((tag_ci("RATING"), le)), parse_float), Condition::MaxRating),
    ))(input)
}

fn parse_where(input: &str) -> IResult<&str, ShipCriteria> {
    let (input, conditions) = preceded(
        ws(tag_ci("WHERE")),
        separated_list1(ws(tag_ci("AND")), parse_condition),
    )(input)?;

    let mut criteria = ShipCriteria::default();
    for condition in conditions {
        condition.apply(&mut criteria);
    }
    Ok((input, criteria))
}

fn parse_order(input: &str) -> IResult<&str, ShipOrder> {
    preceded(
        tuple((ws(tag_ci("ORDER")), ws(tag_ci("BY")))),
        map_opt(alpha1, ShipOrder::parse),
    )(input)
}

fn parse_assignment(input: &str) -> IResult<&str, Assignment> {
    alt((
        map(preceded(tuple((tag_ci("NAME"), eq)), parse_quoted_string), Assignment::Name),
        map(preceded(tuple((tag_ci("PLANET"), eq)), parse_quoted_string), Assignment::Planet),
        map(preceded(tuple((type_field, eq)), parse_ship_type), Assignment::Type),
        map(preceded(tuple((tag_ci("DATE"), eq)), parse_i64), Assignment::Date),
        map(preceded(tuple((tag_ci("USED"), eq)), parse_bool), Assignment::Used),
        map(preceded(tuple((tag_ci("SPEED"), eq)), parse_float), Assignment::Speed),
        map(preceded(tuple((tag_ci("CREW"), eq)), parse_i32), Assignment::Crew),
    ))(input)
}

fn parse_assignments(input: &str) -> IResult<&str, ShipPatch> {
    let (input, assignments) = separated_list1(
        alt((ws(tag(",")), multispace1)),
        parse_assignment,
    )(input)?;

    let mut patch = ShipPatch::default();
    for assignment in assignments {
        assignment.apply(&mut patch);
    }
    Ok((input, patch))
}

// --- COMMAND PARSERS ---

fn parse_list(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("LIST")(input)?;
    let (input, criteria) = opt(parse_where)(input)?;
    let (input, order) = opt(parse_order)(input)?;
    let (input, page_number) = opt(preceded(ws(tag_ci("PAGE")), parse_usize))(input)?;
    let (input, page_size) = opt(preceded(ws(tag_ci("SIZE")), parse_usize))(input)?;

    Ok((input, Command::List {
        criteria: criteria.unwrap_or_default(),
        order: order.unwrap_or_default(),
        page_number,
        page_size,
    }))
}

fn parse_count(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("COUNT")(input)?;
    let (input, criteria) = opt(parse_where)(input)?;
    Ok((input, Command::Count { criteria: criteria.unwrap_or_default() }))
}

fn parse_get(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("GET")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_raw_id(input)?;
    Ok((input, Command::Get { id }))
}

fn parse_create(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("CREATE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, patch) = parse_assignments(input)?;
    Ok((input, Command::Create { draft: patch.into() }))
}

fn parse_update(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("UPDATE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_raw_id(input)?;
    let (input, _) = ws(tag_ci("SET"))(input)?;
    let (input, patch) = parse_assignments(input)?;
    Ok((input, Command::Update { id, patch }))
}

fn parse_delete(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("DELETE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_raw_id(input)?;
    Ok((input, Command::Delete { id }))
}

fn parse_compact(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("COMPACT")(input)?;
    Ok((input, Command::Compact))
}

fn parse_help(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("HELP")(input)?;
    Ok((input, Command::Help))
}

fn parse_exit(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("EXIT"), tag_ci("QUIT")))(input)?;
    Ok((input, Command::Exit))
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    let result = alt((
        parse_list,
        parse_count,
        parse_get,
        parse_create,
        parse_update,
        parse_delete,
        parse_compact,
        parse_help,
        parse_exit,
    ))(input);

    match result {
        Ok((remainder, cmd)) => {
            if !remainder.trim().is_empty() {
                return Err(format!("Unexpected tokens at end: '{}'", remainder));
            }
            Ok(cmd)
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            // e.input contains the slice where parsing failed
            let context: String = e.input.chars().take(20).collect();
            let ellipsis = if e.input.chars().count() > 20 { "..." } else { "" };
            Err(format!("Invalid syntax near: '{}{}'", context, ellipsis))
        },
        Err(nom::Err::Incomplete(_)) => Err("Incomplete command.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_list() {
        assert_eq!(
            parse_command("list").unwrap(),
            Command::List {
                criteria: ShipCriteria::default(),
                order: ShipOrder::Unspecified,
                page_number: None,
                page_size: None,
            }
        );
    }

    #[test]
    fn test_list_with_all_clauses() {
        let cmd = parse_command(
            r#"LIST WHERE name CONTAINS "Star" AND speed >= 0.3 AND speed <= 0.6 AND used = false ORDER BY rating PAGE 2 SIZE 5"#,
        )
        .unwrap();

        let Command::List { criteria, order, page_number, page_size } = cmd else {
            panic!("expected LIST");
        };
        assert_eq!(criteria.name.as_deref(), Some("Star"));
        assert_eq!(criteria.min_speed, Some(0.3));
        assert_eq!(criteria.max_speed, Some(0.6));
        assert_eq!(criteria.is_used, Some(false));
        assert_eq!(order, ShipOrder::Rating);
        assert_eq!(page_number, Some(2));
        assert_eq!(page_size, Some(5));
    }

    #[test]
    fn test_count_with_dates_and_type() {
        let cmd = parse_command("COUNT WHERE type = merchant AND date > 100 AND date < 200 AND crew >= 3").unwrap();
        let Command::Count { criteria } = cmd else {
            panic!("expected COUNT");
        };
        assert_eq!(criteria.ship_type, Some(ShipType::Merchant));
        assert_eq!(criteria.after, Some(100));
        assert_eq!(criteria.before, Some(200));
        assert_eq!(criteria.min_crew_size, Some(3));
    }

    #[test]
    fn test_create() {
        let cmd = parse_command(
            r#"CREATE name="Rocinante" planet="Mars" type=MILITARY date=32503680000000 speed=0.8 crew=4"#,
        )
        .unwrap();
        let Command::Create { draft } = cmd else {
            panic!("expected CREATE");
        };
        assert_eq!(draft.name.as_deref(), Some("Rocinante"));
        assert_eq!(draft.planet.as_deref(), Some("Mars"));
        assert_eq!(draft.ship_type, Some(ShipType::Military));
        assert_eq!(draft.prod_date, Some(32_503_680_000_000));
        assert_eq!(draft.speed, Some(0.8));
        assert_eq!(draft.crew_size, Some(4));
        assert_eq!(draft.is_used, None);
    }

    #[test]
    fn test_update_with_commas() {
        let cmd = parse_command("UPDATE 12 SET used=true, crew=9").unwrap();
        assert_eq!(
            cmd,
            Command::Update {
                id: "12".into(),
                patch: ShipPatch { is_used: Some(true), crew_size: Some(9), ..Default::default() },
            }
        );
    }

    #[test]
    fn test_ids_are_kept_raw() {
        assert_eq!(parse_command("GET -4").unwrap(), Command::Get { id: "-4".into() });
        assert_eq!(parse_command("DELETE 'abc'").unwrap(), Command::Delete { id: "abc".into() });
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_command("LIST ORDER BY colour").is_err());
        assert!(parse_command("UPDATE 3 SET").is_err());
        assert!(parse_command("FLY ME TO THE MOON").is_err());
    }

    #[test]
    fn test_misc_commands() {
        assert_eq!(parse_command("compact").unwrap(), Command::Compact);
        assert_eq!(parse_command("HELP").unwrap(), Command::Help);
        assert_eq!(parse_command("quit").unwrap(), Command::Exit);
    }
}

use comfy_table::{
    presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table,
};
use std::{
    collections::BTreeMap,
    io::{self, Write},
};

use crate::{
    aws::{ec2::LaunchRequest, iam::InstanceProfileRecord},
    choice::letter,
    environment::{KeyPairRecord, SecurityGroupRecord, SubnetRecord},
    image::ImageRecord,
};

const INDENT: &str = "    ";

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table(names: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(names));
    table
}

fn choice_cell(row: usize) -> Cell {
    Cell::new(format!("{}.", letter(row + 1)))
        .fg(Color::Yellow)
        .set_alignment(CellAlignment::Center)
}

/// Render `table` offset from the left margin.
pub fn indented(table: &Table) -> String {
    table
        .to_string()
        .lines()
        .map(|l| format!("{INDENT}{l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write a titled, indented `table` to `out`.
pub fn display_to<W: Write>(out: &mut W, title: &str, table: &Table) -> io::Result<()> {
    writeln!(out, "\n{INDENT}{title}\n")?;
    writeln!(out, "{}", indented(table))
}

pub fn display(title: &str, table: &Table) {
    println!("\n{INDENT}{title}\n");
    println!("{}", indented(table));
}

pub fn subnets(rows: &[SubnetRecord]) -> Table {
    let mut table = new_table(&[
        "Choice",
        "SubnetId",
        "AZ",
        "CIDR",
        "Ip Assignment",
        "State",
        "VpcId",
    ]);
    for (i, s) in rows.iter().enumerate() {
        table.add_row(vec![
            choice_cell(i),
            Cell::new(&s.subnet_id),
            Cell::new(&s.availability_zone),
            Cell::new(&s.cidr_block),
            Cell::new(&s.ip_addresses),
            Cell::new(&s.state),
            Cell::new(&s.vpc_id),
        ]);
    }
    table
}

pub fn security_groups(rows: &[SecurityGroupRecord]) -> Table {
    let mut table = new_table(&["Choice", "GroupId", "GroupName", "VpcId", "Description"]);
    for (i, g) in rows.iter().enumerate() {
        table.add_row(vec![
            choice_cell(i),
            Cell::new(&g.group_id),
            Cell::new(&g.group_name),
            Cell::new(&g.vpc_id),
            Cell::new(&g.description),
        ]);
    }
    table
}

pub fn key_pairs(rows: &[KeyPairRecord]) -> Table {
    let mut table = new_table(&["Choice", "KeyName", "KeyPairId", "Type", "Fingerprint"]);
    for (i, k) in rows.iter().enumerate() {
        table.add_row(vec![
            choice_cell(i),
            Cell::new(&k.key_name),
            Cell::new(&k.key_pair_id),
            Cell::new(&k.key_type),
            Cell::new(&k.key_fingerprint),
        ]);
    }
    table
}

pub fn instance_profiles(rows: &[InstanceProfileRecord]) -> Table {
    let mut table = new_table(&["Choice", "InstanceProfile", "Roles"]);
    for (i, p) in rows.iter().enumerate() {
        table.add_row(vec![
            choice_cell(i),
            Cell::new(&p.name),
            Cell::new(p.roles.join(", ")),
        ]);
    }
    table
}

/// Regions and their image, one row per region.
pub fn images(rows: &BTreeMap<String, ImageRecord>) -> Table {
    let mut table = new_table(&["Region", "ImageId", "Name", "CreationDate"]);
    for (region, img) in rows {
        table.add_row(vec![
            Cell::new(region),
            Cell::new(&img.image_id),
            Cell::new(&img.name),
            Cell::new(&img.creation_date),
        ]);
    }
    table
}

pub fn launch_summary(region: &str, req: &LaunchRequest) -> Table {
    let none = "-".to_string();
    let mut table = new_table(&["Parameter", "Value"]);
    let rows = [
        ("Region", region.to_string()),
        ("ImageId", req.image_id.clone()),
        ("InstanceType", req.instance_type.clone()),
        ("Count", req.count.to_string()),
        ("Name", req.name.clone().unwrap_or_else(|| none.clone())),
        ("SubnetId", req.subnet_id.clone()),
        ("SecurityGroup", req.security_group_id.clone()),
        ("KeyPair", req.key_name.clone().unwrap_or_else(|| none.clone())),
        (
            "InstanceProfile",
            req.instance_profile.clone().unwrap_or_else(|| none.clone()),
        ),
        (
            "UserData",
            if req.user_data.is_some() { "yes" } else { "no" }.to_string(),
        ),
    ];
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key).add_attribute(Attribute::Bold), Cell::new(value)]);
    }
    table
}

pub fn local_profiles(rows: &BTreeMap<String, Option<String>>) -> Table {
    let mut table = new_table(&["Profile", "Region"]);
    for (name, region) in rows {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(region.as_deref().unwrap_or("-")),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnet_table_has_choice_letters() {
        let rows: Vec<_> = (0..3)
            .map(|i| SubnetRecord {
                subnet_id: format!("subnet-{i}"),
                ..Default::default()
            })
            .collect();
        let rendered = subnets(&rows).to_string();
        assert!(rendered.contains("Choice"));
        for label in ["a.", "b.", "c."] {
            assert!(rendered.contains(label));
        }
        assert!(rendered.contains("subnet-2"));
    }

    #[test]
    fn test_indented_offsets_every_line() {
        let rows = vec![KeyPairRecord {
            key_name: "ops".to_string(),
            ..Default::default()
        }];
        let rendered = indented(&key_pairs(&rows));
        assert!(rendered.lines().all(|l| l.starts_with(INDENT)));
    }

    #[test]
    fn test_launch_summary_placeholders() {
        let req = LaunchRequest {
            image_id: "ami-1".to_string(),
            instance_type: "t3.micro".to_string(),
            count: 1,
            subnet_id: "subnet-1".to_string(),
            security_group_id: "sg-1".to_string(),
            ..Default::default()
        };
        let rendered = launch_summary("us-east-2", &req).to_string();
        assert!(rendered.contains("ami-1"));
        assert!(rendered.contains("KeyPair"));
        assert!(rendered.contains("no"));
    }
}

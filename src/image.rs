use aws_sdk_ec2::types::Image;
use chrono::{DateTime, FixedOffset};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating-system families with a well known AMI publisher.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize)]
pub enum OsType {
    /// Amazon Linux v1 (2018)
    #[value(name = "amazonlinux1")]
    #[serde(rename = "amazonlinux1")]
    AmazonLinux1,
    /// Amazon Linux v2
    #[value(name = "amazonlinux2")]
    #[serde(rename = "amazonlinux2")]
    AmazonLinux2,
    /// Amazon Linux 2023
    #[value(name = "amazonlinux2023")]
    #[serde(rename = "amazonlinux2023")]
    AmazonLinux2023,
    /// CentOS 6 (RHEL 6+)
    #[value(name = "centos6")]
    #[serde(rename = "centos6")]
    CentOs6,
    /// CentOS 7 (RHEL 7+)
    #[value(name = "centos7")]
    #[serde(rename = "centos7")]
    CentOs7,
    /// Latest Redhat Enterprise Linux
    #[value(name = "redhat")]
    #[serde(rename = "redhat")]
    Redhat,
    /// Redhat Enterprise Linux 7.4
    #[value(name = "redhat7.4")]
    #[serde(rename = "redhat7.4")]
    Redhat74,
    /// Redhat Enterprise Linux 7.5
    #[value(name = "redhat7.5")]
    #[serde(rename = "redhat7.5")]
    Redhat75,
    /// Ubuntu Linux 14.04
    #[value(name = "ubuntu14.04")]
    #[serde(rename = "ubuntu14.04")]
    Ubuntu1404,
    /// Ubuntu Linux 16.04
    #[value(name = "ubuntu16.04")]
    #[serde(rename = "ubuntu16.04")]
    Ubuntu1604,
    /// Ubuntu Linux 18.04
    #[value(name = "ubuntu18.04")]
    #[serde(rename = "ubuntu18.04")]
    Ubuntu1804,
    /// Ubuntu Linux 20.04
    #[value(name = "ubuntu20.04")]
    #[serde(rename = "ubuntu20.04")]
    Ubuntu2004,
    /// Ubuntu Linux 22.04
    #[value(name = "ubuntu22.04")]
    #[serde(rename = "ubuntu22.04")]
    Ubuntu2204,
    /// Microsoft Windows Server 2012 R2
    #[value(name = "windows2012")]
    #[serde(rename = "windows2012")]
    Windows2012,
    /// Microsoft Windows Server 2016
    #[value(name = "windows2016")]
    #[serde(rename = "windows2016")]
    Windows2016,
    /// Microsoft Windows Server 2019
    #[value(name = "windows2019")]
    #[serde(rename = "windows2019")]
    Windows2019,
    /// Microsoft Windows Server 2022
    #[value(name = "windows2022")]
    #[serde(rename = "windows2022")]
    Windows2022,
}

const AMAZON: &str = "amazon";
const CANONICAL: &str = "099720109477";
const CENTOS: &str = "125523088429";
const CENTOS_MARKETPLACE: &str = "679593333241";
const REDHAT: &str = "309956199498";

impl OsType {
    /// Image owner (account id or alias) to filter `DescribeImages` by.
    pub fn owner(&self) -> &'static str {
        use OsType::*;
        match self {
            AmazonLinux1 | AmazonLinux2 | AmazonLinux2023 => AMAZON,
            CentOs6 => CENTOS_MARKETPLACE,
            CentOs7 => CENTOS,
            Redhat | Redhat74 | Redhat75 => REDHAT,
            Ubuntu1404 | Ubuntu1604 | Ubuntu1804 | Ubuntu2004 | Ubuntu2204 => CANONICAL,
            Windows2012 | Windows2016 | Windows2019 | Windows2022 => AMAZON,
        }
    }

    /// Wildcard pattern for the image `name` filter.
    pub fn name_pattern(&self) -> &'static str {
        use OsType::*;
        match self {
            AmazonLinux1 => "amzn-ami-hvm-*-x86_64-gp2",
            AmazonLinux2 => "amzn2-ami-hvm-*-x86_64-gp2",
            AmazonLinux2023 => "al2023-ami-2023*-x86_64",
            CentOs6 => "CentOS Linux 6 x86_64 HVM EBS*",
            CentOs7 => "CentOS Linux 7 x86_64*",
            Redhat => "RHEL-*_HVM-*-x86_64-*-Hourly2-GP2",
            Redhat74 => "RHEL-7.4_HVM*-x86_64-*",
            Redhat75 => "RHEL-7.5_HVM*-x86_64-*",
            Ubuntu1404 => "ubuntu/images/hvm-ssd/ubuntu-trusty-14.04-amd64-server-*",
            Ubuntu1604 => "ubuntu/images/hvm-ssd/ubuntu-xenial-16.04-amd64-server-*",
            Ubuntu1804 => "ubuntu/images/hvm-ssd/ubuntu-bionic-18.04-amd64-server-*",
            Ubuntu2004 => "ubuntu/images/hvm-ssd/ubuntu-focal-20.04-amd64-server-*",
            Ubuntu2204 => "ubuntu/images/hvm-ssd/ubuntu-jammy-22.04-amd64-server-*",
            Windows2012 => "Windows_Server-2012-R2_RTM-English-64Bit-Base-*",
            Windows2016 => "Windows_Server-2016-English-Full-Base-*",
            Windows2019 => "Windows_Server-2019-English-Full-Base-*",
            Windows2022 => "Windows_Server-2022-English-Full-Base-*",
        }
    }

    pub fn is_windows(&self) -> bool {
        use OsType::*;
        matches!(self, Windows2012 | Windows2016 | Windows2019 | Windows2022)
    }
}

impl fmt::Display for OsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_else(|| format!("{self:?}"));
        f.write_str(&value)
    }
}

/// Metadata kept for an Amazon Machine Image.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ImageRecord {
    pub image_id: String,
    pub name: String,
    pub creation_date: String,
    pub description: String,
    pub architecture: String,
    pub owner_id: String,
    pub root_device_type: String,
    pub virtualization_type: String,
}

impl From<&Image> for ImageRecord {
    fn from(img: &Image) -> Self {
        Self {
            image_id: img.image_id().unwrap_or_default().to_string(),
            name: img.name().unwrap_or_default().to_string(),
            creation_date: img.creation_date().unwrap_or_default().to_string(),
            description: img.description().unwrap_or_default().to_string(),
            architecture: img
                .architecture()
                .map(|a| a.as_str().to_string())
                .unwrap_or_default(),
            owner_id: img.owner_id().unwrap_or_default().to_string(),
            root_device_type: img
                .root_device_type()
                .map(|d| d.as_str().to_string())
                .unwrap_or_default(),
            virtualization_type: img
                .virtualization_type()
                .map(|v| v.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

impl ImageRecord {
    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.creation_date).ok()
    }
}

/// Most recently created image; images with unparseable dates lose.
pub fn newest(images: impl IntoIterator<Item = ImageRecord>) -> Option<ImageRecord> {
    images.into_iter().max_by(|a, b| a.created().cmp(&b.created()))
}

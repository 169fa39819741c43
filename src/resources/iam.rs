//! IAM role, policy, instance profile and access-key resources

use serde::Serialize;
use serde_json::Value as Json;

use crate::template::{ResourceProperties, Value};

/// Resource clause of a policy statement: one value or a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatementResource {
    One(Value),
    Many(Vec<Value>),
}

impl From<Value> for StatementResource {
    fn from(value: Value) -> Self {
        StatementResource::One(value)
    }
}

impl From<Vec<Value>> for StatementResource {
    fn from(values: Vec<Value>) -> Self {
        StatementResource::Many(values)
    }
}

/// A single policy statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    #[serde(rename = "Effect")]
    effect: String,
    #[serde(rename = "Principal", skip_serializing_if = "Option::is_none")]
    principal: Option<Json>,
    #[serde(rename = "Action")]
    action: Vec<String>,
    #[serde(rename = "Resource", skip_serializing_if = "Option::is_none")]
    resource: Option<StatementResource>,
    #[serde(rename = "Condition", skip_serializing_if = "Option::is_none")]
    condition: Option<Json>,
}

impl Statement {
    /// Allow the listed actions on the given resource clause.
    pub fn allow<I, S>(actions: I, resource: impl Into<StatementResource>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            effect: "Allow".to_string(),
            principal: None,
            action: actions.into_iter().map(Into::into).collect(),
            resource: Some(resource.into()),
            condition: None,
        }
    }

    /// Attach a principal clause (queue policies, trust policies).
    pub fn principal(mut self, principal: Json) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Attach a condition clause.
    pub fn condition(mut self, condition: Json) -> Self {
        self.condition = Some(condition);
        self
    }

    /// The EC2 service trust statement used by every instance role.
    pub fn ec2_assume_role() -> Self {
        Self {
            effect: "Allow".to_string(),
            principal: Some(serde_json::json!({"Service": ["ec2.amazonaws.com"]})),
            action: vec!["sts:AssumeRole".to_string()],
            resource: None,
            condition: None,
        }
    }
}

/// A policy document: an ordered list of statements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyDocument {
    #[serde(rename = "Statement")]
    statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self { statement }
    }
}

/// A named inline policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    policy_name: String,
    policy_document: PolicyDocument,
}

impl Policy {
    pub fn new(name: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            policy_name: name.into(),
            policy_document: PolicyDocument::new(statements),
        }
    }
}

/// IAM role trusted by the EC2 service, carrying per-tier inline policies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    assume_role_policy_document: PolicyDocument,
    path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    policies: Vec<Policy>,
}

impl Role {
    /// Instance role with the EC2 trust policy and the given inline policies.
    pub fn for_instances(policies: Vec<Policy>) -> Self {
        Self {
            assume_role_policy_document: PolicyDocument::new(vec![Statement::ec2_assume_role()]),
            path: "/".to_string(),
            policies,
        }
    }
}

impl ResourceProperties for Role {
    const KIND: &'static str = "AWS::IAM::Role";
}

/// Instance profile binding a role to launched instances.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceProfile {
    path: String,
    roles: Vec<Value>,
}

impl InstanceProfile {
    pub fn for_role(role: Value) -> Self {
        Self {
            path: "/".to_string(),
            roles: vec![role],
        }
    }
}

impl ResourceProperties for InstanceProfile {
    const KIND: &'static str = "AWS::IAM::InstanceProfile";
}

/// IAM user for external credential distribution (log shippers).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    policies: Vec<Policy>,
}

impl User {
    pub fn with_policies(policies: Vec<Policy>) -> Self {
        Self { policies }
    }
}

impl ResourceProperties for User {
    const KIND: &'static str = "AWS::IAM::User";
}

/// Access key issued to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessKey {
    user_name: Value,
}

impl AccessKey {
    pub fn for_user(user: Value) -> Self {
        Self { user_name: user }
    }
}

impl ResourceProperties for AccessKey {
    const KIND: &'static str = "AWS::IAM::AccessKey";
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn allow_statement_serializes_single_and_list_resources() {
        let wildcard = Statement::allow(["ec2:Describe*"], Value::from("*"));
        assert_eq!(
            serde_json::to_value(&wildcard).unwrap(),
            json!({"Effect": "Allow", "Action": ["ec2:Describe*"], "Resource": "*"})
        );

        let listed = Statement::allow(
            ["sqs:SendMessage"],
            vec![Value::get_att("loggingQueue", "Arn")],
        );
        assert_eq!(
            serde_json::to_value(&listed).unwrap(),
            json!({
                "Effect": "Allow",
                "Action": ["sqs:SendMessage"],
                "Resource": [{"Fn::GetAtt": ["loggingQueue", "Arn"]}]
            })
        );
    }

    #[test]
    fn instance_role_carries_ec2_trust_policy() {
        let role = Role::for_instances(vec![Policy::new(
            "sqsWrite",
            vec![Statement::allow(
                ["sqs:SendMessage"],
                vec![Value::get_att("loggingQueue", "Arn")],
            )],
        )]);
        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(
            json["AssumeRolePolicyDocument"]["Statement"][0],
            json!({
                "Effect": "Allow",
                "Principal": {"Service": ["ec2.amazonaws.com"]},
                "Action": ["sts:AssumeRole"]
            })
        );
        assert_eq!(json["Policies"][0]["PolicyName"], json!("sqsWrite"));
    }
}
